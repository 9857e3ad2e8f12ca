//! # sre-assistant
//!
//! The AI SRE assistant pipeline.
//!
//! An invocation receives a compressed log batch from a subscription filter,
//! keeps the most recent non-empty lines, asks a hosted model for a
//! structured triage and posts the rendered result to a chat webhook.
//!
//! ```text
//! InboundEvent -> decode -> extract -> prompt -> infer -> parse -> format -> deliver
//! ```
//!
//! The three external collaborators sit behind traits so they can be swapped
//! out in tests:
//!
//! - [`InferenceClient`] with [`BedrockClient`] as the production implementation
//! - [`sre_notify::SecretLookup`] for the webhook secret
//! - [`sre_notify::NotificationTransport`] for delivery
//!
//! ## Example
//!
//! ```rust,no_run
//! use sre_assistant::{AssistantConfig, Pipeline};
//!
//! # async fn example(raw_event: &str) -> sre_assistant::Result<()> {
//! let config = AssistantConfig::default().with_webhook_secret_name("slack/webhook/ai-sre-assistant");
//! let pipeline = Pipeline::from_config(config)?;
//!
//! let report = pipeline.handle_json(raw_event).await?;
//! println!("{} lines analyzed, delivered: {}", report.lines_analyzed, report.delivery.is_sent());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod inference;
pub mod pipeline;

pub use config::{AssistantConfig, DEFAULT_MODEL_ID, DEFAULT_REGION};
pub use error::{AssistantError, Result};
pub use inference::{BedrockClient, InferenceClient};
pub use pipeline::{Delivery, InvocationReport, Pipeline, PreparedRequest, SkipReason};
