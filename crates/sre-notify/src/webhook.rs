//! Notification transports.
//!
//! A transport performs a single delivery attempt with a bounded timeout.
//! Retries, if any, belong to whatever invokes the pipeline.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{NotifyError, Result};
use crate::secrets::{BoxFuture, WebhookUrl};

/// Default delivery timeout.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of an accepted delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// The transport that delivered the message.
    pub channel: String,
    /// Response status code.
    pub status_code: u16,
}

impl DeliveryReceipt {
    /// Creates a receipt.
    #[must_use]
    pub fn new(channel: impl Into<String>, status_code: u16) -> Self {
        Self {
            channel: channel.into(),
            status_code,
        }
    }
}

/// Delivers plain-text messages to a chat endpoint.
pub trait NotificationTransport: Send + Sync + fmt::Debug {
    /// Returns the name of this transport.
    fn name(&self) -> &str;

    /// Sends `text` to `url` once.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Delivery` or `NotifyError::DeliveryRejected`.
    fn deliver<'a>(
        &'a self,
        url: &'a WebhookUrl,
        text: &'a str,
    ) -> BoxFuture<'a, Result<DeliveryReceipt>>;
}

/// The JSON body posted to an incoming webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// The message text.
    pub text: String,
}

/// Slack incoming-webhook transport.
#[derive(Debug, Clone)]
pub struct SlackWebhookTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl SlackWebhookTransport {
    /// Creates a transport with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Http` if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_DELIVERY_TIMEOUT)
    }

    /// Creates a transport with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Http` if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn post(&self, url: &WebhookUrl, text: &str) -> Result<DeliveryReceipt> {
        let payload = WebhookPayload {
            text: text.to_string(),
        };

        let response = self
            .client
            .post(url.as_str())
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery {
                reason: if e.is_timeout() {
                    format!("timed out after {}s", self.timeout.as_secs())
                } else {
                    e.without_url().to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(channel = %self.name(), status = status.as_u16(), "webhook rejected notification");
            return Err(NotifyError::DeliveryRejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            channel = %self.name(),
            status = status.as_u16(),
            chars = text.chars().count(),
            "notification delivered"
        );
        debug!(text = %text, "delivered notification text");

        Ok(DeliveryReceipt::new(self.name(), status.as_u16()))
    }
}

impl NotificationTransport for SlackWebhookTransport {
    fn name(&self) -> &str {
        "slack"
    }

    fn deliver<'a>(
        &'a self,
        url: &'a WebhookUrl,
        text: &'a str,
    ) -> BoxFuture<'a, Result<DeliveryReceipt>> {
        Box::pin(self.post(url, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn hook(server: &mockito::Server) -> WebhookUrl {
        WebhookUrl::new(format!("{}/services/T000/B000/XXXX", server.url()))
    }

    #[test]
    fn payload_shape() {
        let payload = WebhookPayload {
            text: "hello".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&payload).expect("serializes"),
            r#"{"text":"hello"}"#
        );
    }

    #[test]
    fn default_timeout_is_ten_seconds() {
        let transport = SlackWebhookTransport::new().expect("client builds");
        assert_eq!(transport.timeout(), Duration::from_secs(10));
        assert_eq!(transport.name(), "slack");
    }

    #[tokio::test]
    async fn posts_text_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/services/T000/B000/XXXX")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({"text": "🔥 AI SRE Assistant [P1]"})))
            .with_status(200)
            .with_body("ok")
            .expect(1)
            .create_async()
            .await;

        let transport = SlackWebhookTransport::new().expect("client builds");
        let receipt = transport
            .deliver(&hook(&server), "🔥 AI SRE Assistant [P1]")
            .await
            .expect("delivers");

        assert_eq!(receipt, DeliveryReceipt::new("slack", 200));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_rejected_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/services/T000/B000/XXXX")
            .with_status(403)
            .with_body("invalid_token")
            .expect(1)
            .create_async()
            .await;

        let transport = SlackWebhookTransport::new().expect("client builds");
        let err = transport.deliver(&hook(&server), "x").await.unwrap_err();

        assert!(matches!(
            err,
            NotifyError::DeliveryRejected { status: 403, ref body } if body == "invalid_token"
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_delivery_error() {
        let transport =
            SlackWebhookTransport::with_timeout(Duration::from_millis(500)).expect("client builds");
        let err = transport
            .deliver(&WebhookUrl::new("http://127.0.0.1:9/hook"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Delivery { .. }));
    }
}
