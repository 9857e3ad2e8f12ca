//! Webhook endpoint resolution through a secret lookup collaborator.
//!
//! The webhook URL lives in a secret shaped as `{"webhook_url": "..."}`.
//! [`WebhookUrlCache`] resolves it at most once per long-lived context and
//! never invalidates it; rotating the secret means starting a new context.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{NotifyError, Result};

/// Boxed future returned by collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A resolved webhook URL.
///
/// The URL embeds a credential, so `Debug` redacts it.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookUrl(String);

impl WebhookUrl {
    /// Wraps a URL string.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Returns the URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WebhookUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookUrl(<redacted>)")
    }
}

/// Looks up secret values by name.
pub trait SecretLookup: Send + Sync + fmt::Debug {
    /// Returns the secret's string value, or `None` if it has none.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::SecretLookup` if the collaborator fails.
    fn get_secret_string<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>>;
}

/// In-memory secret lookup for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretLookup {
    secrets: HashMap<String, String>,
}

impl StaticSecretLookup {
    /// Creates an empty lookup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret.
    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }

    /// Adds a webhook secret in the expected JSON shape.
    #[must_use]
    pub fn with_webhook_url(self, name: impl Into<String>, url: &str) -> Self {
        let value = serde_json::json!({ "webhook_url": url }).to_string();
        self.with_secret(name, value)
    }
}

impl SecretLookup for StaticSecretLookup {
    fn get_secret_string<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            self.secrets
                .get(name)
                .cloned()
                .map(Some)
                .ok_or_else(|| NotifyError::SecretLookup {
                    name: name.to_string(),
                    reason: "secret not found".to_string(),
                })
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExtensionSecretResponse {
    #[serde(default)]
    secret_string: Option<String>,
}

/// Secret lookup through the Lambda parameters-and-secrets extension.
///
/// The extension serves `GET /secretsmanager/get?secretId=<name>` on
/// localhost and authenticates callers with the session token.
#[derive(Clone)]
pub struct ExtensionSecretLookup {
    client: reqwest::Client,
    endpoint: String,
    session_token: String,
}

impl fmt::Debug for ExtensionSecretLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionSecretLookup")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ExtensionSecretLookup {
    /// Default extension endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:2773";

    /// Header carrying the session token.
    pub const TOKEN_HEADER: &'static str = "X-Aws-Parameters-Secrets-Token";

    /// Request timeout.
    pub const TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a lookup against the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Http` if the HTTP client cannot be built.
    pub fn new(session_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Self::TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            session_token: session_token.into(),
        })
    }

    /// Overrides the extension endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch(&self, name: &str) -> Result<Option<String>> {
        let lookup_error = |reason: String| NotifyError::SecretLookup {
            name: name.to_string(),
            reason,
        };

        let response = self
            .client
            .get(format!("{}/secretsmanager/get", self.endpoint))
            .query(&[("secretId", name)])
            .header(Self::TOKEN_HEADER, &self.session_token)
            .send()
            .await
            .map_err(|e| lookup_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(lookup_error(format!("status {}: {body}", status.as_u16())));
        }

        let parsed: ExtensionSecretResponse = response
            .json()
            .await
            .map_err(|e| lookup_error(e.to_string()))?;

        debug!(secret = %name, has_value = parsed.secret_string.is_some(), "fetched secret");
        Ok(parsed.secret_string)
    }
}

impl SecretLookup for ExtensionSecretLookup {
    fn get_secret_string<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(self.fetch(name))
    }
}

#[derive(Debug, Deserialize)]
struct WebhookSecret {
    #[serde(default)]
    webhook_url: Option<String>,
}

/// Extracts the webhook URL from a secret value.
///
/// Returns `None` for an empty secret or a missing/empty `webhook_url`.
///
/// # Errors
///
/// Returns `NotifyError::InvalidSecret` if a non-empty secret is not a JSON object.
pub fn parse_webhook_secret(secret: &str) -> Result<Option<WebhookUrl>> {
    if secret.trim().is_empty() {
        return Ok(None);
    }
    let parsed: WebhookSecret =
        serde_json::from_str(secret).map_err(|e| NotifyError::InvalidSecret {
            reason: e.to_string(),
        })?;
    Ok(parsed
        .webhook_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .map(WebhookUrl))
}

/// Lazily resolved, never invalidated webhook URL.
#[derive(Debug)]
pub struct WebhookUrlCache {
    secret_name: String,
    resolved: OnceCell<Option<WebhookUrl>>,
}

impl WebhookUrlCache {
    /// Creates a cache for the given secret reference. An empty reference disables delivery.
    #[must_use]
    pub fn new(secret_name: impl Into<String>) -> Self {
        Self {
            secret_name: secret_name.into().trim().to_string(),
            resolved: OnceCell::new(),
        }
    }

    /// Returns the secret reference.
    #[must_use]
    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// Returns true if a secret reference is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.secret_name.is_empty()
    }

    /// Returns true once a lookup has completed successfully.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.initialized()
    }

    /// Resolves the webhook URL, consulting `lookup` only on first success.
    ///
    /// Failed lookups are not cached.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::SecretLookup` or `NotifyError::InvalidSecret`.
    pub async fn resolve(&self, lookup: &dyn SecretLookup) -> Result<Option<&WebhookUrl>> {
        if !self.is_configured() {
            return Ok(None);
        }

        let resolved = self
            .resolved
            .get_or_try_init(|| async {
                let secret = lookup.get_secret_string(&self.secret_name).await?;
                let url = match secret {
                    Some(value) => parse_webhook_secret(&value)?,
                    None => None,
                };
                info!(
                    secret = %self.secret_name,
                    found = url.is_some(),
                    "resolved webhook secret"
                );
                Ok::<_, NotifyError>(url)
            })
            .await?;

        Ok(resolved.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingLookup {
        inner: StaticSecretLookup,
        calls: AtomicUsize,
    }

    impl SecretLookup for CountingLookup {
        fn get_secret_string<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_secret_string(name)
        }
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn parses_webhook_url() {
            let url = parse_webhook_secret(r#"{"webhook_url":"https://hooks.slack.com/services/X/Y/Z"}"#)
                .expect("parses")
                .expect("url present");
            assert_eq!(url.as_str(), "https://hooks.slack.com/services/X/Y/Z");
        }

        #[test]
        fn empty_secret_has_no_url() {
            assert!(parse_webhook_secret("").expect("parses").is_none());
            assert!(parse_webhook_secret("   ").expect("parses").is_none());
        }

        #[test]
        fn missing_or_blank_field_has_no_url() {
            assert!(parse_webhook_secret("{}").expect("parses").is_none());
            assert!(parse_webhook_secret(r#"{"webhook_url": " "}"#).expect("parses").is_none());
        }

        #[test]
        fn non_json_secret_is_invalid() {
            let err = parse_webhook_secret("https://hooks.slack.com/raw").unwrap_err();
            assert!(matches!(err, NotifyError::InvalidSecret { .. }));
        }

        #[test]
        fn debug_redacts_url() {
            let url = WebhookUrl::new("https://hooks.slack.com/services/SECRET");
            assert!(!format!("{url:?}").contains("SECRET"));
        }
    }

    mod cache_tests {
        use super::*;

        #[tokio::test]
        async fn resolves_once() {
            let lookup = CountingLookup {
                inner: StaticSecretLookup::new().with_webhook_url("slack", "https://example.test/hook"),
                ..CountingLookup::default()
            };
            let cache = WebhookUrlCache::new("slack");

            for _ in 0..3 {
                let url = cache.resolve(&lookup).await.expect("resolves");
                assert_eq!(url.map(WebhookUrl::as_str), Some("https://example.test/hook"));
            }
            assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
            assert!(cache.is_resolved());
        }

        #[tokio::test]
        async fn empty_reference_skips_lookup() {
            let lookup = CountingLookup::default();
            let cache = WebhookUrlCache::new("  ");

            assert!(!cache.is_configured());
            assert!(cache.resolve(&lookup).await.expect("resolves").is_none());
            assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn empty_secret_cached_as_absent() {
            let lookup = CountingLookup {
                inner: StaticSecretLookup::new().with_secret("slack", ""),
                ..CountingLookup::default()
            };
            let cache = WebhookUrlCache::new("slack");

            assert!(cache.resolve(&lookup).await.expect("resolves").is_none());
            assert!(cache.resolve(&lookup).await.expect("resolves").is_none());
            assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn failures_are_not_cached() {
            let lookup = CountingLookup::default();
            let cache = WebhookUrlCache::new("missing");

            assert!(cache.resolve(&lookup).await.is_err());
            assert!(cache.resolve(&lookup).await.is_err());
            assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
            assert!(!cache.is_resolved());
        }
    }

    mod extension_tests {
        use super::*;
        use mockito::Matcher;

        #[tokio::test]
        async fn fetches_secret_string() {
            let mut server = mockito::Server::new_async().await;
            let mock = server
                .mock("GET", "/secretsmanager/get")
                .match_query(Matcher::UrlEncoded(
                    "secretId".into(),
                    "slack/webhook/ai-sre-assistant".into(),
                ))
                .match_header("x-aws-parameters-secrets-token", "session-token")
                .with_status(200)
                .with_body(r#"{"Name": "slack/webhook/ai-sre-assistant", "SecretString": "{\"webhook_url\":\"https://example.test\"}"}"#)
                .create_async()
                .await;

            let lookup = ExtensionSecretLookup::new("session-token")
                .expect("client builds")
                .with_endpoint(server.url());
            let secret = lookup
                .get_secret_string("slack/webhook/ai-sre-assistant")
                .await
                .expect("fetches");

            assert_eq!(secret.as_deref(), Some(r#"{"webhook_url":"https://example.test"}"#));
            mock.assert_async().await;
        }

        #[tokio::test]
        async fn missing_secret_string_is_none() {
            let mut server = mockito::Server::new_async().await;
            let _mock = server
                .mock("GET", "/secretsmanager/get")
                .match_query(Matcher::Any)
                .with_status(200)
                .with_body(r#"{"Name": "binary-secret", "SecretBinary": "AAEC"}"#)
                .create_async()
                .await;

            let lookup = ExtensionSecretLookup::new("t")
                .expect("client builds")
                .with_endpoint(server.url());
            assert!(lookup.get_secret_string("binary-secret").await.expect("fetches").is_none());
        }

        #[tokio::test]
        async fn error_status_is_lookup_failure() {
            let mut server = mockito::Server::new_async().await;
            let _mock = server
                .mock("GET", "/secretsmanager/get")
                .match_query(Matcher::Any)
                .with_status(400)
                .with_body("ResourceNotFoundException")
                .create_async()
                .await;

            let lookup = ExtensionSecretLookup::new("t")
                .expect("client builds")
                .with_endpoint(server.url());
            let err = lookup.get_secret_string("nope").await.unwrap_err();
            assert!(err.to_string().contains("status 400"));
        }
    }
}
