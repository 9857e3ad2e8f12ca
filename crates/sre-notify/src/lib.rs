//! Chat notification delivery for the AI SRE assistant.
//!
//! `sre-notify` provides the two external collaborators the pipeline
//! delivers through:
//!
//! - **Secret lookup**: [`SecretLookup`] resolves the webhook secret, and
//!   [`WebhookUrlCache`] holds the resolved URL for the lifetime of the
//!   execution context
//! - **Transport**: [`NotificationTransport`] performs a single bounded POST,
//!   with [`SlackWebhookTransport`] as the incoming-webhook implementation
//!
//! # Example
//!
//! ```rust
//! use sre_notify::{StaticSecretLookup, WebhookUrlCache};
//!
//! # async fn example() -> sre_notify::Result<()> {
//! let lookup = StaticSecretLookup::new()
//!     .with_webhook_url("slack/webhook", "https://hooks.slack.com/services/X/Y/Z");
//! let cache = WebhookUrlCache::new("slack/webhook");
//!
//! let url = cache.resolve(&lookup).await?;
//! assert!(url.is_some());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod secrets;
pub mod webhook;

pub use error::{NotifyError, Result};
pub use secrets::{
    parse_webhook_secret, BoxFuture, ExtensionSecretLookup, SecretLookup, StaticSecretLookup,
    WebhookUrl, WebhookUrlCache,
};
pub use webhook::{
    DeliveryReceipt, NotificationTransport, SlackWebhookTransport, WebhookPayload,
    DEFAULT_DELIVERY_TIMEOUT,
};
