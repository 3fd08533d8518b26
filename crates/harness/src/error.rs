//! Error types for the E2E harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Playwright not found. Install with: npm i playwright && npx playwright install")]
    DriverNotFound,

    #[error("Driver script failed: {0}")]
    Script(String),

    #[error("App failed to start: {0}")]
    AppStartup(String),

    #[error("App never became ready after {0} probes")]
    AppUnreachable(usize),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Element not visible within {timeout_ms} ms: {selector}")]
    NotVisible { selector: String, timeout_ms: u64 },

    #[error("Could not locate element: {0}")]
    Locate(String),

    #[error("Screenshot artifact error: {0}")]
    Artifact(String),

    #[error("Screenshot mismatch: {name} differs by {diff_percent:.2}% (threshold: {threshold:.2}%)")]
    ScreenshotMismatch {
        name: String,
        diff_percent: f64,
        threshold: f64,
    },

    #[error("Baseline not found: {0}")]
    BaselineNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
