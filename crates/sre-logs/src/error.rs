//! Error types for log batch decoding.

use std::fmt;

use thiserror::Error;

/// The decoding stage at which a payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStage {
    /// Parsing the envelope itself.
    Envelope,
    /// Base64 decoding of the batch data.
    Base64,
    /// Gzip decompression.
    Gzip,
    /// JSON parsing of the decompressed batch.
    Json,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Envelope => write!(f, "envelope"),
            Self::Base64 => write!(f, "base64"),
            Self::Gzip => write!(f, "gzip"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Errors that can occur while decoding or encoding log batches.
#[derive(Debug, Error)]
pub enum LogsError {
    /// The inbound payload could not be decoded into a batch.
    #[error("malformed payload ({stage}): {reason}")]
    MalformedPayload {
        /// The stage that failed.
        stage: DecodeStage,
        /// What went wrong.
        reason: String,
    },

    /// A batch could not be encoded into an envelope.
    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl LogsError {
    /// Creates a malformed payload error for the given stage.
    pub fn malformed(stage: DecodeStage, reason: impl fmt::Display) -> Self {
        Self::MalformedPayload {
            stage,
            reason: reason.to_string(),
        }
    }

    /// Returns the failing stage for malformed payloads.
    #[must_use]
    pub const fn stage(&self) -> Option<DecodeStage> {
        match self {
            Self::MalformedPayload { stage, .. } => Some(*stage),
            Self::Encoding(_) => None,
        }
    }
}

/// Result type alias for log batch operations.
pub type Result<T> = std::result::Result<T, LogsError>;
