//! Core types for decoded log batches.
//!
//! This module provides:
//! - [`InboundEvent`] — The subscription envelope as delivered to the handler
//! - [`LogBatch`] — A decoded batch of log events from one log stream
//! - [`LogEvent`] — A single log event inside a batch
//! - [`MessageType`] — Data vs. control messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The inbound subscription envelope.
///
/// The batch itself travels as base64-encoded, gzip-compressed JSON in
/// `awslogs.data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// The nested log delivery payload.
    pub awslogs: AwsLogsData,
}

/// The `awslogs` field of an [`InboundEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsLogsData {
    /// Base64-encoded gzip-compressed JSON batch.
    pub data: String,
}

impl InboundEvent {
    /// Wraps already-encoded batch data in an envelope.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            awslogs: AwsLogsData { data: data.into() },
        }
    }

    /// Returns the encoded batch data.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.awslogs.data
    }
}

/// Kind of message carried by a subscription batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Regular batch of application log events.
    #[default]
    DataMessage,
    /// Health check sent by the aggregation source; carries no application lines.
    ControlMessage,
}

/// A single log event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Event identifier assigned by the aggregation source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// The raw log message.
    pub message: String,
}

impl LogEvent {
    /// Creates an event carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp: None,
            message: message.into(),
        }
    }

    /// Sets the event id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the timestamp in epoch milliseconds.
    #[must_use]
    pub const fn with_timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    /// Returns the event time, if the timestamp is present and representable.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::from_timestamp_millis)
    }
}

/// A decoded batch of log events from a single log stream.
///
/// `logGroup`, `logStream` and `logEvents` are required; the remaining
/// fields pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogBatch {
    /// Kind of message.
    #[serde(default)]
    pub message_type: MessageType,
    /// Account that owns the source log group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Source log group name.
    pub log_group: String,
    /// Source log stream name.
    pub log_stream: String,
    /// Names of the subscription filters that matched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscription_filters: Vec<String>,
    /// Events in delivery order (oldest first).
    pub log_events: Vec<LogEvent>,
}

impl LogBatch {
    /// Creates a data batch for the given group and stream.
    #[must_use]
    pub fn new(log_group: impl Into<String>, log_stream: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::DataMessage,
            owner: None,
            log_group: log_group.into(),
            log_stream: log_stream.into(),
            subscription_filters: Vec::new(),
            log_events: Vec::new(),
        }
    }

    /// Appends an event.
    #[must_use]
    pub fn with_event(mut self, event: LogEvent) -> Self {
        self.log_events.push(event);
        self
    }

    /// Appends one message-only event per line.
    #[must_use]
    pub fn with_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.log_events
            .extend(messages.into_iter().map(LogEvent::new));
        self
    }

    /// Sets the message type.
    #[must_use]
    pub const fn with_message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    /// Returns true for destination health checks.
    #[must_use]
    pub fn is_control_message(&self) -> bool {
        self.message_type == MessageType::ControlMessage
    }

    /// Returns the number of events in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log_events.len()
    }

    /// Returns true if the batch holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log_events.is_empty()
    }

    /// Returns the earliest and latest event times in the batch.
    #[must_use]
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut times = self.log_events.iter().filter_map(LogEvent::time);
        let first = times.next()?;
        Some(times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_event_time_from_millis() {
        let event = LogEvent::new("boom").with_timestamp(1_700_000_000_000);
        let time = event.time().expect("timestamp should convert");
        assert_eq!(time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn log_event_without_timestamp_has_no_time() {
        assert!(LogEvent::new("boom").time().is_none());
    }

    #[test]
    fn batch_deserializes_source_format() {
        let json = r#"{
            "messageType": "DATA_MESSAGE",
            "owner": "123456789012",
            "logGroup": "/aws/lambda/app",
            "logStream": "2024/01/01/[$LATEST]abc",
            "subscriptionFilters": ["AppErrorSubscription"],
            "logEvents": [
                {"id": "1", "timestamp": 1700000000000, "message": "ERROR first"},
                {"id": "2", "timestamp": 1700000001000, "message": "ERROR second"}
            ]
        }"#;

        let batch: LogBatch = serde_json::from_str(json).expect("valid batch");
        assert_eq!(batch.log_group, "/aws/lambda/app");
        assert_eq!(batch.owner.as_deref(), Some("123456789012"));
        assert_eq!(batch.subscription_filters, vec!["AppErrorSubscription"]);
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_control_message());
    }

    #[test]
    fn batch_message_type_defaults_to_data() {
        let json = r#"{"logGroup": "g", "logStream": "s", "logEvents": []}"#;
        let batch: LogBatch = serde_json::from_str(json).expect("valid batch");
        assert_eq!(batch.message_type, MessageType::DataMessage);
        assert!(batch.is_empty());
    }

    #[test]
    fn batch_control_message() {
        let json = r#"{"messageType": "CONTROL_MESSAGE", "logGroup": "", "logStream": "", "logEvents": [{"message": "CWL CONTROL MESSAGE: Checking health of destination"}]}"#;
        let batch: LogBatch = serde_json::from_str(json).expect("valid batch");
        assert!(batch.is_control_message());
    }

    #[test]
    fn batch_requires_log_events() {
        let json = r#"{"logGroup": "g", "logStream": "s"}"#;
        assert!(serde_json::from_str::<LogBatch>(json).is_err());
    }

    #[test]
    fn batch_time_span() {
        let batch = LogBatch::new("g", "s")
            .with_event(LogEvent::new("b").with_timestamp(2_000))
            .with_event(LogEvent::new("a").with_timestamp(1_000))
            .with_event(LogEvent::new("no time"));

        let (lo, hi) = batch.time_span().expect("span present");
        assert_eq!(lo.timestamp_millis(), 1_000);
        assert_eq!(hi.timestamp_millis(), 2_000);
    }

    #[test]
    fn batch_time_span_empty() {
        assert!(LogBatch::new("g", "s").with_messages(["x"]).time_span().is_none());
    }

    #[test]
    fn inbound_event_shape() {
        let event: InboundEvent =
            serde_json::from_str(r#"{"awslogs": {"data": "H4sI"}}"#).expect("valid envelope");
        assert_eq!(event.data(), "H4sI");
        assert_eq!(event, InboundEvent::new("H4sI"));
    }
}
