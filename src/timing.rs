//! Stage timing for a capture run
//!
//! Each step of the run is timed once. Timings are kept for the report and
//! also emitted through the `metrics` facade, which is inert unless the
//! embedding program installs a recorder.

use metrics::{counter, histogram};
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// One step of the fixed capture sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStage {
    /// Configuration checks before the browser starts
    Setup,
    Launch,
    OpenPage,
    Navigate,
    /// The fixed wait after navigation
    Settle,
    Capture,
    Write,
    Shutdown,
}

impl CaptureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStage::Setup => "setup",
            CaptureStage::Launch => "launch",
            CaptureStage::OpenPage => "open_page",
            CaptureStage::Navigate => "navigate",
            CaptureStage::Settle => "settle",
            CaptureStage::Capture => "capture",
            CaptureStage::Write => "write",
            CaptureStage::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for CaptureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: CaptureStage,
    pub duration: Duration,
}

/// Records how long each stage of a run takes.
#[derive(Debug)]
pub struct StageTimer {
    started: Instant,
    timings: Vec<StageTiming>,
}

impl StageTimer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            timings: Vec::new(),
        }
    }

    /// Await `fut` and record its duration under `stage`, whatever it returns.
    pub async fn time<F, T>(&mut self, stage: CaptureStage, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let start = Instant::now();
        let output = fut.await;
        self.record(stage, start.elapsed());
        output
    }

    pub fn record(&mut self, stage: CaptureStage, duration: Duration) {
        debug!("Stage {} took {:?}", stage, duration);
        histogram!(
            "capture_stage_duration_seconds",
            duration.as_secs_f64(),
            "stage" => stage.as_str()
        );
        self.timings.push(StageTiming { stage, duration });
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn timings(&self) -> &[StageTiming] {
        &self.timings
    }

    pub fn into_timings(self) -> Vec<StageTiming> {
        self.timings
    }
}

impl Default for StageTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Count a finished run by outcome.
pub fn record_outcome(success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "failure" };
    counter!("capture_runs_total", 1, "outcome" => outcome);
    histogram!("capture_run_duration_seconds", elapsed.as_secs_f64());
}
