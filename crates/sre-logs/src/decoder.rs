//! Subscription envelope codec.
//!
//! Batches arrive as JSON, gzip-compressed, then base64-encoded. Any stage
//! failing is fatal for the invocation: there is no partial recovery.

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::debug;

use crate::error::{DecodeStage, LogsError, Result};
use crate::types::{InboundEvent, LogBatch};

/// Decodes an inbound envelope into a [`LogBatch`].
///
/// # Errors
///
/// Returns `LogsError::MalformedPayload` on bad base64, corrupt gzip,
/// invalid JSON or missing required keys.
pub fn decode_payload(event: &InboundEvent) -> Result<LogBatch> {
    let compressed = STANDARD
        .decode(event.data().trim())
        .map_err(|e| LogsError::malformed(DecodeStage::Base64, e))?;

    let mut json = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(|e| LogsError::malformed(DecodeStage::Gzip, e))?;

    let batch: LogBatch =
        serde_json::from_slice(&json).map_err(|e| LogsError::malformed(DecodeStage::Json, e))?;

    debug!(
        log_group = %batch.log_group,
        log_stream = %batch.log_stream,
        events = batch.len(),
        compressed_bytes = compressed.len(),
        json_bytes = json.len(),
        "decoded log batch"
    );

    Ok(batch)
}

/// Parses raw envelope JSON text and decodes the batch it carries.
///
/// # Errors
///
/// Returns `LogsError::MalformedPayload` if the envelope or the batch is malformed.
pub fn decode_envelope(raw: &str) -> Result<LogBatch> {
    let event: InboundEvent =
        serde_json::from_str(raw).map_err(|e| LogsError::malformed(DecodeStage::Envelope, e))?;
    decode_payload(&event)
}

/// Encodes a batch into an envelope, the inverse of [`decode_payload`].
///
/// # Errors
///
/// Returns `LogsError::Encoding` if serialization or compression fails.
pub fn encode_payload(batch: &LogBatch) -> Result<InboundEvent> {
    let json = serde_json::to_vec(batch).map_err(|e| LogsError::Encoding(e.to_string()))?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| LogsError::Encoding(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| LogsError::Encoding(e.to_string()))?;

    Ok(InboundEvent::new(STANDARD.encode(compressed)))
}
