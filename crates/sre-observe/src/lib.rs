//! # sre-observe
//!
//! LLM-backed triage of error log lines.
//!
//! This crate turns extracted log lines into a schema-constrained inference
//! request, parses the model's answer into a structured [`AnalysisResult`],
//! and renders that analysis as a chat notification.
//!
//! ## Features
//!
//! - **Prompt Construction**: Strict JSON-only instructions plus a schema skeleton
//! - **Defensive Parsing**: Missing or malformed fields fall back to defaults
//! - **Bounded Output**: At most 3 hypotheses and 5 displayed actions
//! - **Notification Formatting**: Empty sections are left out
//!
//! ## Quick Start
//!
//! ```rust
//! use sre_observe::{format_notification, parse_analysis, Severity, SourceMeta};
//!
//! let analysis = parse_analysis(
//!     r#"{"overall_assessment": {"summary": "DB timeout", "severity": "P1"}}"#,
//! ).unwrap();
//! assert_eq!(analysis.severity(), Severity::P1);
//!
//! let message = format_notification(&analysis, &SourceMeta::new("/aws/lambda/app", "stream"));
//! assert!(message.as_str().contains("[P1]"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bounded;
pub mod error;
pub mod formatter;
pub mod parser;
pub mod prompt;
pub mod types;

pub use bounded::BoundedVec;
pub use error::{ObserveError, Result};
pub use formatter::{
    format_notification, NotificationMessage, SourceMeta, ASSISTANT_LABEL, MAX_DISPLAYED_ACTIONS,
};
pub use parser::{extract_answer_text, parse_analysis, parse_response};
pub use prompt::{
    ContentBlock, InferenceRequest, Message, PromptBuilder, Role, ANTHROPIC_VERSION,
    DEFAULT_LANGUAGE, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, SCHEMA_SKELETON,
};
pub use types::{
    AnalysisResult, Facts, Hypothesis, OverallAssessment, Priority, RecommendedAction, Severity,
    MAX_HYPOTHESES,
};
