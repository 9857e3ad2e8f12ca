//! Error types for the sre-observe crate.

use thiserror::Error;

/// Errors that can occur while preparing or interpreting model calls.
#[derive(Debug, Error)]
pub enum ObserveError {
    /// The inference response envelope had no usable answer text.
    #[error("malformed response envelope: {reason}")]
    MalformedEnvelope {
        /// The reason the envelope was rejected.
        reason: String,
    },

    /// The model's answer was not a JSON object.
    #[error("analysis parse error: {reason}")]
    AnalysisParse {
        /// The reason parsing failed.
        reason: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, ObserveError>;
