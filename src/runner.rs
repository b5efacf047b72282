//! The capture sequence
//!
//! `CaptureRunner` performs the one fixed path: launch the browser, open a
//! page, navigate, wait, screenshot, write the file, close the browser. There
//! are no retries. Whatever fails ends the run, and the browser is shut down
//! on every path before the error is returned.

use crate::timing::record_outcome;
use crate::{
    format_bytes, format_duration, image_dimensions, write_output, BrowserEngine, CaptureError,
    CaptureStage, ChromeEngine, Config, OutputFormat, StageTimer, StageTiming,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureReport {
    pub target_url: String,
    pub output_path: PathBuf,
    pub format: OutputFormat,
    pub file_size: usize,
    pub width: u32,
    pub height: u32,
    pub page_title: Option<String>,
    pub final_url: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub stages: Vec<StageTiming>,
}

struct Captured {
    file_size: usize,
    width: u32,
    height: u32,
    page_title: Option<String>,
    final_url: Option<String>,
    captured_at: DateTime<Utc>,
}

/// Runs the capture sequence for one `Config`.
///
/// # Examples
///
/// ```rust,no_run
/// use admin_capture::{CaptureRunner, Config};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let runner = CaptureRunner::new(Config::default())?;
///     let report = runner.run().await?;
///     println!("Wrote {} bytes to {}", report.file_size, report.output_path.display());
///     Ok(())
/// }
/// ```
pub struct CaptureRunner {
    config: Config,
    format: OutputFormat,
}

impl CaptureRunner {
    /// Validate `config` up front so a bad output path fails before Chrome starts.
    pub fn new(config: Config) -> Result<Self, CaptureError> {
        config.validate()?;
        let format = config.output_format()?;
        Ok(Self { config, format })
    }

    /// Launch headless Chrome and run the sequence against it.
    pub async fn run(&self) -> Result<CaptureReport, CaptureError> {
        let mut timer = StageTimer::new();

        info!("Launching browser");
        let engine = match timer
            .time(CaptureStage::Launch, ChromeEngine::launch(&self.config))
            .await
        {
            Ok(engine) => engine,
            Err(e) => return Err(self.fail(e, &timer)),
        };

        self.run_on(engine, timer).await
    }

    /// Run the sequence against an already launched engine.
    ///
    /// The engine is shut down before this returns, whatever the outcome.
    pub async fn run_with<E: BrowserEngine>(&self, engine: E) -> Result<CaptureReport, CaptureError> {
        self.run_on(engine, StageTimer::new()).await
    }

    async fn run_on<E: BrowserEngine>(
        &self,
        mut engine: E,
        mut timer: StageTimer,
    ) -> Result<CaptureReport, CaptureError> {
        let result = self.drive(&mut engine, &mut timer).await;

        timer
            .time(CaptureStage::Shutdown, engine.shutdown())
            .await;

        match result {
            Ok(captured) => {
                let elapsed = timer.elapsed();
                record_outcome(true, elapsed);
                info!("Capture completed in {}", format_duration(elapsed));

                Ok(CaptureReport {
                    target_url: self.config.target_url.clone(),
                    output_path: self.config.output_path.clone(),
                    format: self.format,
                    file_size: captured.file_size,
                    width: captured.width,
                    height: captured.height,
                    page_title: captured.page_title,
                    final_url: captured.final_url,
                    captured_at: captured.captured_at,
                    elapsed,
                    stages: timer.into_timings(),
                })
            }
            Err(e) => Err(self.fail(e, &timer)),
        }
    }

    async fn drive<E: BrowserEngine>(
        &self,
        engine: &mut E,
        timer: &mut StageTimer,
    ) -> Result<Captured, CaptureError> {
        let viewport = &self.config.viewport;
        debug!("Opening page at {}x{}", viewport.width, viewport.height);
        timer
            .time(CaptureStage::OpenPage, engine.open_page(viewport))
            .await?;

        info!("Navigating to {}", self.config.target_url);
        timer
            .time(CaptureStage::Navigate, engine.navigate(&self.config.target_url))
            .await?;

        let delay = self.config.settle_delay();
        info!("Waiting {} before capture", format_duration(delay));
        timer.time(CaptureStage::Settle, sleep(delay)).await;

        let page_title = engine.page_title().await;
        let final_url = engine.page_url().await;
        debug!("Page title: {:?}, final URL: {:?}", page_title, final_url);

        let png_data = timer
            .time(CaptureStage::Capture, engine.capture(self.config.full_page))
            .await?;
        let captured_at = Utc::now();

        let data = self.format.encode(png_data)?;
        let (width, height) = image_dimensions(&data)?;

        timer
            .time(
                CaptureStage::Write,
                write_output(&self.config.output_path, &data),
            )
            .await?;
        info!(
            "Screenshot saved to {} ({}, {}x{})",
            self.config.output_path.display(),
            format_bytes(data.len()),
            width,
            height
        );

        Ok(Captured {
            file_size: data.len(),
            width,
            height,
            page_title,
            final_url,
            captured_at,
        })
    }

    fn fail(&self, err: CaptureError, timer: &StageTimer) -> CaptureError {
        error!("Capture failed during {}: {}", err.stage(), err);
        record_outcome(false, timer.elapsed());
        err
    }
}
