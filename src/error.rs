//! Error types for the weekly tracker.

use thiserror::Error;

/// Main error type for tracker operations.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Input rejected before any state was touched.
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse email: {0}")]
    EmailParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
