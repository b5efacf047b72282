//! Configuration for a capture run
//!
//! Every field defaults to the fixed values the tool was built around: the
//! local admin page, a five second settle delay and a single PNG under
//! `jules-scratch/verification/`. Running with no arguments and no config file
//! uses exactly these values.

use crate::{CaptureError, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Page the runner navigates to.
pub const DEFAULT_TARGET_URL: &str = "http://localhost:3000/#/admin";

/// Blind delay between the load event and the screenshot, in milliseconds.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 5000;

/// Where the captured image is written, relative to the working directory.
pub const DEFAULT_OUTPUT_PATH: &str = "jules-scratch/verification/admin_page.png";

/// Main configuration structure for a capture run
///
/// # Examples
///
/// ```rust
/// use admin_capture::Config;
///
/// // The fixed admin page capture
/// let config = Config::default();
/// assert_eq!(config.target_url, "http://localhost:3000/#/admin");
///
/// // Same sequence against another page
/// let config = Config {
///     target_url: "http://localhost:8080/".to_string(),
///     settle_delay_ms: 1000,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// URL handed to the browser as-is (default: the local admin route)
    ///
    /// Not parsed or validated; an unreachable or malformed URL surfaces as a
    /// navigation failure from the browser.
    pub target_url: String,

    /// Unconditional wait after navigation, in milliseconds (default: 5000)
    ///
    /// This is a fixed delay, not a readiness check. The page may or may not
    /// have finished rendering when it elapses.
    pub settle_delay_ms: u64,

    /// Output image path (default: `jules-scratch/verification/admin_page.png`)
    ///
    /// The extension selects the encoding. Existing files are overwritten.
    pub output_path: PathBuf,

    /// Browser viewport used for rendering and capture
    pub viewport: Viewport,

    /// Capture the whole scrollable page instead of the viewport (default: false)
    pub full_page: bool,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            viewport: Viewport::default(),
            full_page: false,
            chrome_path: None,
        }
    }
}

impl Config {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Encoding implied by the output path extension.
    pub fn output_format(&self) -> Result<OutputFormat, CaptureError> {
        OutputFormat::from_path(&self.output_path)
    }

    /// Reject values the browser cannot work with before anything is launched.
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(CaptureError::ConfigurationError(
                "Viewport dimensions must be greater than 0".to_string(),
            ));
        }

        if self.viewport.device_scale_factor <= 0.0 {
            return Err(CaptureError::ConfigurationError(
                "Device scale factor must be greater than 0".to_string(),
            ));
        }

        self.output_format()?;

        Ok(())
    }
}

/// Browser viewport configuration
///
/// Defaults to 1280x720 at a scale factor of 1.0, the size a fresh headless
/// page gets from common automation drivers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Viewport {
    /// Viewport width in pixels (default: 1280)
    pub width: u32,

    /// Viewport height in pixels (default: 720)
    pub height: u32,

    /// Device pixel ratio (default: 1.0)
    pub device_scale_factor: f64,

    /// Whether to emulate a mobile device (default: false)
    pub mobile: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            device_scale_factor: 1.0,
            mobile: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_run() {
        let config = Config::default();
        assert_eq!(config.target_url, DEFAULT_TARGET_URL);
        assert_eq!(config.settle_delay(), Duration::from_secs(5));
        assert_eq!(config.output_path, PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert!(!config.full_page);
        assert!(config.chrome_path.is_none());
        assert!(matches!(config.output_format(), Ok(OutputFormat::Png)));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"settle_delay_ms": 250}"#).unwrap();
        assert_eq!(config.settle_delay_ms, 250);
        assert_eq!(config.target_url, DEFAULT_TARGET_URL);
        assert_eq!(config.viewport, Viewport::default());

        let config: Config =
            serde_json::from_str(r#"{"viewport": {"width": 800}}"#).unwrap();
        assert_eq!(config.viewport.width, 800);
        assert_eq!(config.viewport.height, 720);
    }

    #[test]
    fn test_validate_rejects_empty_viewport() {
        let config = Config {
            viewport: Viewport {
                height: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CaptureError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_extension() {
        let config = Config {
            output_path: PathBuf::from("shot.gif"),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CaptureError::UnsupportedOutputFormat(_))
        ));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }
}
