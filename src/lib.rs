//! # Admin Capture
//!
//! Captures one screenshot of a locally served admin page with headless
//! Chrome. A run is a fixed sequence with no branches and no retries:
//!
//! 1. launch the browser
//! 2. open a page sized to the viewport
//! 3. navigate to the target URL and wait for the load event
//! 4. wait a fixed delay
//! 5. take a screenshot and write it to the output path
//! 6. close the browser
//!
//! Any failure ends the run with an error. The browser is closed on every
//! path, including when the run future is dropped.
//!
//! ## Defaults
//!
//! | Setting | Value |
//! |---------|-------|
//! | Target URL | `http://localhost:3000/#/admin` |
//! | Settle delay | 5000 ms |
//! | Output path | `jules-scratch/verification/admin_page.png` |
//! | Viewport | 1280x720, scale 1.0 |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use admin_capture::{CaptureRunner, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = CaptureRunner::new(Config::default())?;
//!     let report = runner.run().await?;
//!     println!("Screenshot captured: {} bytes", report.file_size);
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # The fixed capture
//! admin-capture
//!
//! # Same sequence, different page and file
//! admin-capture --url http://localhost:8080/ --output shots/home.jpg --wait 1000
//! ```

/// Configuration and the fixed defaults
pub mod config;

/// Error types
pub mod error;

/// Headless Chrome engine and the engine trait the runner drives
pub mod browser;

/// The capture sequence
pub mod runner;

/// Per-stage timing
pub mod timing;

/// Command-line interface implementation
pub mod cli;

/// Output format and formatting helpers
pub mod utils;


pub use browser::*;
pub use cli::*;
pub use config::*;
pub use error::*;
pub use runner::*;
pub use timing::*;
pub use utils::*;
