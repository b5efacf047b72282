use crate::CaptureStage;
use thiserror::Error;

/// Failure of a capture run.
///
/// Variants name the step that failed so the diagnostic is readable. None of
/// them are retried or recovered from: every error ends the run.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Page error: {0}")]
    PageError(String),

    #[error("Navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Image encoding failed: {0}")]
    ImageEncodingFailed(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedOutputFormat(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Capture interrupted")]
    Interrupted,
}

impl CaptureError {
    /// Stage of the run this error belongs to, used for log and metric labels.
    pub fn stage(&self) -> CaptureStage {
        match self {
            CaptureError::BrowserLaunchFailed(_) => CaptureStage::Launch,
            CaptureError::PageError(_) => CaptureStage::OpenPage,
            CaptureError::NavigationFailed { .. } => CaptureStage::Navigate,
            CaptureError::CaptureFailed(_) | CaptureError::ImageEncodingFailed(_) => {
                CaptureStage::Capture
            }
            CaptureError::IoError(_) => CaptureStage::Write,
            CaptureError::UnsupportedOutputFormat(_)
            | CaptureError::ConfigurationError(_)
            | CaptureError::SerializationError(_) => CaptureStage::Setup,
            CaptureError::Interrupted => CaptureStage::Shutdown,
        }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CaptureError {
    fn from(err: serde_json::Error) -> Self {
        CaptureError::SerializationError(err.to_string())
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        CaptureError::ImageEncodingFailed(err.to_string())
    }
}
