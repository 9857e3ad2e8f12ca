//! Core types for model-produced log analyses.
//!
//! The model is probabilistic, so every field deserializes leniently:
//! missing keys, `null`, and values of the wrong JSON type fall back to
//! documented defaults instead of failing the whole analysis.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bounded::BoundedVec;

/// Maximum number of hypotheses retained from a model answer.
pub const MAX_HYPOTHESES: usize = 3;

/// Incident severity tier, P0 being the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Severity {
    /// Full outage or data loss.
    P0,
    /// Major functionality impaired.
    P1,
    /// Partial degradation. Used when the model gives no usable severity.
    #[default]
    P2,
    /// Minor issue.
    P3,
}

impl Severity {
    /// All tiers, most severe first.
    pub const ALL: [Self; 4] = [Self::P0, Self::P1, Self::P2, Self::P3];

    /// Parses a tier, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P0" => Some(Self::P0),
            "P1" => Some(Self::P1),
            "P2" => Some(Self::P2),
            "P3" => Some(Self::P3),
            _ => None,
        }
    }

    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
        }
    }

    /// Returns an emoji representation for display purposes.
    #[must_use]
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::P0 => "🚨",
            Self::P1 => "🔥",
            Self::P2 => "⚠️",
            Self::P3 => "ℹ️",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().and_then(Self::parse).unwrap_or_default())
    }
}

/// Priority of a recommended action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    /// Do this first.
    High,
    /// Default when the model gives no usable priority.
    #[default]
    Medium,
    /// Can wait.
    Low,
}

impl Priority {
    /// Parses a priority, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().and_then(Self::parse).unwrap_or_default())
    }
}

/// Directly observed facts. Only content visible in the log lines belongs here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facts {
    /// Exception or error class name.
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Time of the failure as printed in the logs.
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Service or component named in the logs.
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub affected_service: Option<String>,
    /// HTTP status code, if one was logged.
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub http_status: Option<String>,
    /// Verbatim log lines the analysis relies on.
    #[serde(default, deserialize_with = "lenient::lines", skip_serializing_if = "Vec::is_empty")]
    pub key_log_lines: Vec<String>,
}

impl Facts {
    /// Returns true if no fact was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Returns the reported facts as `(field, value)` pairs in fixed order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        let scalars = [
            ("error_type", &self.error_type),
            ("timestamp", &self.timestamp),
            ("affected_service", &self.affected_service),
            ("http_status", &self.http_status),
        ];
        for (name, value) in scalars {
            if let Some(value) = value {
                entries.push((name, value.clone()));
            }
        }
        if !self.key_log_lines.is_empty() {
            entries.push(("key_log_lines", self.key_log_lines.join(" / ")));
        }
        entries
    }
}

/// A candidate explanation for the observed failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Short title.
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    /// Why the model believes this.
    #[serde(default, deserialize_with = "lenient::string")]
    pub reasoning: String,
    /// Self-reported certainty, 0–100.
    #[serde(default, deserialize_with = "lenient::confidence")]
    pub confidence: u8,
}

impl Hypothesis {
    /// Creates a hypothesis, clamping confidence to 100.
    #[must_use]
    pub fn new(title: impl Into<String>, reasoning: impl Into<String>, confidence: u8) -> Self {
        Self {
            title: title.into(),
            reasoning: reasoning.into(),
            confidence: confidence.min(100),
        }
    }

    /// Returns true if there is no title to show.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty()
    }
}

/// A recommended next step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedAction {
    /// What to do.
    #[serde(default, deserialize_with = "lenient::string")]
    pub action: String,
    /// How urgently.
    #[serde(default)]
    pub priority: Priority,
}

impl RecommendedAction {
    /// Creates a recommended action.
    #[must_use]
    pub fn new(action: impl Into<String>, priority: Priority) -> Self {
        Self {
            action: action.into(),
            priority,
        }
    }

    /// Returns true if there is no action to show.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.action.trim().is_empty()
    }
}

/// The model's overall judgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallAssessment {
    /// One or two sentence summary.
    #[serde(default, deserialize_with = "lenient::string")]
    pub summary: String,
    /// Severity tier; `P2` when absent or unrecognized.
    #[serde(default)]
    pub severity: Severity,
}

impl OverallAssessment {
    /// Creates an assessment.
    #[must_use]
    pub fn new(summary: impl Into<String>, severity: Severity) -> Self {
        Self {
            summary: summary.into(),
            severity,
        }
    }
}

/// A structured analysis of one log batch.
///
/// Hypotheses are capped at [`MAX_HYPOTHESES`] when parsed (first ones
/// win). Recommended actions are kept in full; display code caps them.
/// Items without a title or action are dropped while parsing and never
/// take a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Observed facts.
    #[serde(default, deserialize_with = "lenient::value_or_default")]
    pub facts: Facts,
    /// Candidate explanations, in the model's order.
    #[serde(default, deserialize_with = "lenient::hypotheses")]
    pub hypotheses: BoundedVec<Hypothesis, MAX_HYPOTHESES>,
    /// Recommended actions, in the model's order.
    #[serde(default, deserialize_with = "lenient::actions")]
    pub recommended_actions: Vec<RecommendedAction>,
    /// Overall judgement.
    #[serde(default, deserialize_with = "lenient::value_or_default")]
    pub overall_assessment: OverallAssessment,
}

impl AnalysisResult {
    /// Creates an analysis with the given assessment and nothing else.
    #[must_use]
    pub fn new(overall_assessment: OverallAssessment) -> Self {
        Self {
            overall_assessment,
            ..Self::default()
        }
    }

    /// Sets the facts.
    #[must_use]
    pub fn with_facts(mut self, facts: Facts) -> Self {
        self.facts = facts;
        self
    }

    /// Adds a hypothesis; ignored once the cap is reached.
    #[must_use]
    pub fn with_hypothesis(mut self, hypothesis: Hypothesis) -> Self {
        self.hypotheses.push(hypothesis);
        self
    }

    /// Adds a recommended action.
    #[must_use]
    pub fn with_action(mut self, action: RecommendedAction) -> Self {
        self.recommended_actions.push(action);
        self
    }

    /// Returns the severity tier.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.overall_assessment.severity
    }
}

/// Default-substituting field deserializers.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use tracing::{debug, warn};

    use super::{BoundedVec, Hypothesis, RecommendedAction, MAX_HYPOTHESES};

    /// Deserializes `T`, substituting `T::default()` for null or mismatched values.
    pub(super) fn value_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(T::default());
        }
        Ok(serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "unexpected shape, using default");
            T::default()
        }))
    }

    /// Deserializes a sequence, skipping elements that do not match `T`.
    pub(super) fn seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let Value::Array(items) = Value::deserialize(deserializer)? else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(error = %e, "skipping malformed sequence element");
                    None
                }
            })
            .collect())
    }

    /// Hypotheses without a title are dropped before the cap applies.
    pub(super) fn hypotheses<'de, D>(
        deserializer: D,
    ) -> Result<BoundedVec<Hypothesis, MAX_HYPOTHESES>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items: Vec<Hypothesis> = seq(deserializer)?;
        let total = items.len();
        let bounded: BoundedVec<Hypothesis, MAX_HYPOTHESES> =
            items.into_iter().filter(|h| !h.is_blank()).collect();
        let blank = total - bounded.len() - bounded.dropped();
        if blank > 0 {
            debug!(blank, "dropped hypotheses without a title");
        }
        if bounded.dropped() > 0 {
            warn!(
                kept = bounded.len(),
                dropped = bounded.dropped(),
                "hypotheses exceeded capacity, truncated"
            );
        }
        Ok(bounded)
    }

    /// Actions without any text are dropped.
    pub(super) fn actions<'de, D>(deserializer: D) -> Result<Vec<RecommendedAction>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut items: Vec<RecommendedAction> = seq(deserializer)?;
        let total = items.len();
        items.retain(|a| !a.is_blank());
        if items.len() < total {
            debug!(blank = total - items.len(), "dropped actions without text");
        }
        Ok(items)
    }

    fn scalar_text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Optional text; numbers and booleans are stringified, blanks become `None`.
    pub(super) fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(scalar_text(Value::deserialize(deserializer)?))
    }

    /// Text with an empty-string default.
    pub(super) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(text(deserializer)?.unwrap_or_default())
    }

    /// A list of lines; a single string is accepted as a one-line list.
    pub(super) fn lines<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
            other => scalar_text(other).into_iter().collect(),
        })
    }

    /// Confidence as an integer percentage; rounded, clamped to 0–100, 0 when unusable.
    pub(super) fn confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let raw = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(raw
            .filter(|v| v.is_finite())
            .map_or(0, |v| v.round().clamp(0.0, 100.0) as u8))
    }
}
