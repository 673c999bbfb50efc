//! Error types for the Argus monitor
//!
//! Structured error definitions via thiserror, with anyhow interop for
//! callers that propagate opaque errors.

use thiserror::Error;

/// Main error type for Argus operations
#[derive(Error, Debug)]
pub enum ArgusError {
    /// I/O error (listener bind, state file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio pipeline error (transcription, synthesis, remux)
    #[error("Audio error: {0}")]
    Audio(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Argus operations
pub type Result<T> = std::result::Result<T, ArgusError>;

/// Convert anyhow::Error to ArgusError
impl From<anyhow::Error> for ArgusError {
    fn from(err: anyhow::Error) -> Self {
        ArgusError::Other(err.to_string())
    }
}
