//! Error types for the sre-notify crate.

use thiserror::Error;

/// Errors that can occur while resolving endpoints or delivering notifications.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The secret lookup collaborator failed.
    #[error("secret lookup failed for '{name}': {reason}")]
    SecretLookup {
        /// The secret reference that was looked up.
        name: String,
        /// The reason the lookup failed.
        reason: String,
    },

    /// The secret value is not the expected JSON document.
    #[error("invalid secret: {reason}")]
    InvalidSecret {
        /// The reason the secret was rejected.
        reason: String,
    },

    /// The notification could not be sent.
    #[error("notification delivery failed: {reason}")]
    Delivery {
        /// The reason delivery failed.
        reason: String,
    },

    /// The endpoint answered with a non-success status.
    #[error("notification rejected with status {status}: {body}")]
    DeliveryRejected {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },

    /// HTTP client construction failed.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
