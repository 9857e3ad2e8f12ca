//! Bounded extraction of the most recent log lines.

use serde::{Deserialize, Serialize};

use crate::types::LogBatch;

/// Default number of lines handed to the model.
pub const DEFAULT_MAX_LINES: usize = 30;

/// Ordered, non-empty, trimmed log lines; never longer than the cap used to build them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedLines(Vec<String>);

impl ExtractedLines {
    /// Returns the lines as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns the number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no lines were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the lines, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Re-applies a cap, keeping the newest `cap` lines.
    #[must_use]
    pub fn recap(self, cap: usize) -> Self {
        Self::from_messages(self.0, cap)
    }

    /// Consumes the wrapper and returns the lines.
    #[must_use]
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    fn from_messages<I, S>(messages: I, cap: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines: Vec<String> = messages
            .into_iter()
            .filter_map(|m| {
                let trimmed = m.as_ref().trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect();

        let excess = lines.len().saturating_sub(cap);
        lines.drain(..excess);
        Self(lines)
    }
}

impl<'a> IntoIterator for &'a ExtractedLines {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Extracts at most `cap` of the most recent non-empty lines from a batch.
///
/// Messages are trimmed and whitespace-only messages dropped before the cap
/// is applied, so truncation always removes the oldest lines.
#[must_use]
pub fn extract_lines(batch: &LogBatch, cap: usize) -> ExtractedLines {
    ExtractedLines::from_messages(batch.log_events.iter().map(|e| e.message.as_str()), cap)
}
