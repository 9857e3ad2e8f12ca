//! Human-readable notification formatting.
//!
//! Sections appear in a fixed order and are left out entirely when their
//! content is empty.

#![allow(clippy::format_push_string)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{AnalysisResult, Facts, Hypothesis, RecommendedAction, MAX_HYPOTHESES};

/// Label shown in the notification header.
pub const ASSISTANT_LABEL: &str = "AI SRE Assistant";

/// Maximum number of recommended actions shown in a notification.
pub const MAX_DISPLAYED_ACTIONS: usize = 5;

/// Where the analyzed lines came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMeta {
    /// Source log group.
    pub log_group: String,
    /// Source log stream.
    pub log_stream: String,
}

impl SourceMeta {
    /// Creates source metadata.
    #[must_use]
    pub fn new(log_group: impl Into<String>, log_stream: impl Into<String>) -> Self {
        Self {
            log_group: log_group.into(),
            log_stream: log_stream.into(),
        }
    }
}

/// A formatted, ready-to-send notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationMessage(String);

impl NotificationMessage {
    /// Returns the message text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the message and returns its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NotificationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Formats an analysis and its source into a notification.
#[must_use]
pub fn format_notification(analysis: &AnalysisResult, source: &SourceMeta) -> NotificationMessage {
    let mut sections = vec![format_header(analysis, source)];

    let summary = analysis.overall_assessment.summary.trim();
    if !summary.is_empty() {
        sections.push(format!("*Summary*\n{summary}"));
    }

    if !analysis.facts.is_empty() {
        sections.push(format_facts(&analysis.facts));
    }

    let hypotheses: Vec<&Hypothesis> = analysis
        .hypotheses
        .iter()
        .filter(|h| !h.is_blank())
        .take(MAX_HYPOTHESES)
        .collect();
    if !hypotheses.is_empty() {
        sections.push(format_hypotheses(&hypotheses));
    }

    let actions: Vec<&RecommendedAction> = analysis
        .recommended_actions
        .iter()
        .filter(|a| !a.is_blank())
        .take(MAX_DISPLAYED_ACTIONS)
        .collect();
    if !actions.is_empty() {
        sections.push(format_actions(&actions));
    }

    NotificationMessage(sections.join("\n\n"))
}

fn format_header(analysis: &AnalysisResult, source: &SourceMeta) -> String {
    let severity = analysis.severity();
    format!(
        "{} {ASSISTANT_LABEL} [{severity}]\nLog group: {}\nLog stream: {}",
        severity.emoji(),
        source.log_group,
        source.log_stream
    )
}

/// Joins the non-blank lines of `text` with " / ".
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

fn format_facts(facts: &Facts) -> String {
    let mut section = String::from("*Facts*");
    for (name, value) in facts.entries() {
        section.push_str(&format!("\n• {name}: {}", single_line(&value)));
    }
    section
}

fn format_hypotheses(hypotheses: &[&Hypothesis]) -> String {
    let mut section = String::from("*Hypotheses*");
    for (i, hypothesis) in hypotheses.iter().enumerate() {
        section.push_str(&format!(
            "\n{}. {} (confidence: {}%)",
            i + 1,
            single_line(&hypothesis.title),
            hypothesis.confidence
        ));
        let reasoning = single_line(&hypothesis.reasoning);
        if !reasoning.is_empty() {
            section.push_str(&format!("\n   {reasoning}"));
        }
    }
    section
}

fn format_actions(actions: &[&RecommendedAction]) -> String {
    let mut section = String::from("*Recommended actions*");
    for action in actions {
        section.push_str(&format!("\n• [{}] {}", action.priority, single_line(&action.action)));
    }
    section
}
