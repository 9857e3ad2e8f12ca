//! # sre-logs
//!
//! Decoding and line extraction for subscription-delivered log batches.
//!
//! This crate provides:
//!
//! - [`InboundEvent`] — The base64 + gzip + JSON subscription envelope
//! - [`LogBatch`] / [`LogEvent`] — The decoded batch
//! - [`decode_payload`] / [`encode_payload`] — The envelope codec
//! - [`extract_lines`] — The bounded tail of non-empty lines sent for analysis
//!
//! ## Example
//!
//! ```rust
//! use sre_logs::{decode_payload, encode_payload, extract_lines, LogBatch};
//!
//! let batch = LogBatch::new("/aws/lambda/app", "stream-1")
//!     .with_messages(["ERROR first", "   ", "ERROR second"]);
//!
//! let event = encode_payload(&batch).unwrap();
//! let decoded = decode_payload(&event).unwrap();
//!
//! let lines = extract_lines(&decoded, 30);
//! assert_eq!(lines.len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod decoder;
pub mod error;
pub mod extractor;
pub mod types;

pub use decoder::{decode_envelope, decode_payload, encode_payload};
pub use error::{DecodeStage, LogsError, Result};
pub use extractor::{extract_lines, ExtractedLines, DEFAULT_MAX_LINES};
pub use types::{AwsLogsData, InboundEvent, LogBatch, LogEvent, MessageType};
