//! Error types for the assistant pipeline.

use sre_logs::LogsError;
use sre_notify::NotifyError;
use sre_observe::ObserveError;
use thiserror::Error;

/// Fatal conditions that abort an invocation.
///
/// No variant leaves a partial notification behind: every failure happens
/// either before delivery or during the single delivery attempt.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// The inbound payload could not be decoded.
    #[error(transparent)]
    MalformedPayload(#[from] LogsError),

    /// The inference collaborator failed or returned an unusable envelope.
    #[error("inference unavailable: {reason}")]
    InferenceUnavailable {
        /// The reason the call failed.
        reason: String,
    },

    /// The model's answer was not valid JSON.
    #[error("analysis parse error: {reason}")]
    AnalysisParse {
        /// The reason parsing failed.
        reason: String,
    },

    /// The webhook secret could not be resolved.
    #[error("secret lookup failed: {0}")]
    SecretLookup(#[source] NotifyError),

    /// The notification transport failed.
    #[error("delivery failed: {0}")]
    Delivery(#[source] NotifyError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AssistantError {
    /// Returns a stable name for the error kind, for structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedPayload(_) => "MalformedPayload",
            Self::InferenceUnavailable { .. } => "InferenceUnavailable",
            Self::AnalysisParse { .. } => "AnalysisParseError",
            Self::SecretLookup(_) => "SecretLookup",
            Self::Delivery(_) => "Delivery",
            Self::Config(_) => "Config",
        }
    }
}

impl From<ObserveError> for AssistantError {
    fn from(err: ObserveError) -> Self {
        match err {
            ObserveError::MalformedEnvelope { reason } => Self::InferenceUnavailable { reason },
            ObserveError::AnalysisParse { reason } => Self::AnalysisParse { reason },
            ObserveError::Serialization(e) => Self::AnalysisParse {
                reason: e.to_string(),
            },
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sre_logs::DecodeStage;

    #[test]
    fn malformed_payload_is_transparent() {
        let err: AssistantError = LogsError::malformed(DecodeStage::Base64, "bad byte").into();
        assert_eq!(err.to_string(), "malformed payload (base64): bad byte");
        assert_eq!(err.kind(), "MalformedPayload");
    }

    #[test]
    fn envelope_errors_become_inference_unavailable() {
        let err: AssistantError = ObserveError::MalformedEnvelope {
            reason: "no content blocks".to_string(),
        }
        .into();
        assert!(matches!(err, AssistantError::InferenceUnavailable { .. }));
        assert_eq!(err.to_string(), "inference unavailable: no content blocks");
    }

    #[test]
    fn answer_errors_become_analysis_parse() {
        let err: AssistantError = ObserveError::AnalysisParse {
            reason: "expected value".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "AnalysisParseError");
    }

    #[test]
    fn delivery_wraps_notify_error() {
        let err = AssistantError::Delivery(NotifyError::Delivery {
            reason: "timed out".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "delivery failed: notification delivery failed: timed out"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AssistantError>();
    }
}
