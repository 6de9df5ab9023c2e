// Error Types
// Fatal precondition failures and configuration errors for the scoring engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResonanceError {
    #[error("Spectrum size mismatch: expected {expected} values, got {actual}")]
    SpectrumSizeMismatch { expected: usize, actual: usize },
    #[error("Invalid band count {bands} for spectrum of size {size}")]
    InvalidBandCount { bands: usize, size: usize },
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Analysis task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, ResonanceError>;

/// Failure of an optional model capability. Never surfaced past the scoring boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("Capability unavailable: {0}")]
    Unavailable(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Invalid capability output: {0}")]
    InvalidOutput(String),
}
