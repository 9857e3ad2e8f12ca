//! Inference collaborator.
//!
//! The pipeline hands a fully built [`InferenceRequest`] to an
//! [`InferenceClient`] and receives the raw response envelope back as text.
//! Envelope parsing stays in `sre-observe`.

use std::fmt;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use sre_notify::BoxFuture;
use sre_observe::InferenceRequest;
use tracing::{debug, warn};

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};

/// Invokes a hosted model.
pub trait InferenceClient: Send + Sync + fmt::Debug {
    /// Sends `request` to `model_id` and returns the raw response body.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError::InferenceUnavailable` on any failure.
    fn invoke<'a>(
        &'a self,
        model_id: &'a str,
        request: &'a InferenceRequest,
    ) -> BoxFuture<'a, Result<String>>;
}

fn unavailable(reason: impl Into<String>) -> AssistantError {
    AssistantError::InferenceUnavailable {
        reason: reason.into(),
    }
}

/// Bedrock runtime `InvokeModel` client.
///
/// Authenticates with a bearer API key when one is configured.
#[derive(Clone)]
pub struct BedrockClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl fmt::Debug for BedrockClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BedrockClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.api_key.is_some())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl BedrockClient {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError::Config` if the endpoint is not a base URL or
    /// the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| AssistantError::Config(format!("invalid inference endpoint: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(AssistantError::Config(format!(
                "inference endpoint is not a base URL: {endpoint}"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistantError::Config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key: None,
            timeout,
        })
    }

    /// Creates a client from the assistant configuration.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError::Config` if the endpoint is invalid.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let client = Self::new(&config.inference_endpoint(), config.inference_timeout())?;
        Ok(match config.bedrock_api_key.as_deref() {
            Some(key) if !key.is_empty() => client.with_api_key(key),
            _ => client,
        })
    }

    /// Sets the bearer API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Returns the `InvokeModel` URL for `model_id`.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError::InferenceUnavailable` if the model id is empty.
    pub fn invoke_url(&self, model_id: &str) -> Result<Url> {
        if model_id.is_empty() {
            return Err(unavailable("model id is empty"));
        }

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| unavailable("endpoint cannot carry a path"))?
            .pop_if_empty()
            .extend(["model", model_id, "invoke"]);
        Ok(url)
    }

    async fn send(&self, model_id: &str, request: &InferenceRequest) -> Result<String> {
        let url = self.invoke_url(model_id)?;
        debug!(model = %model_id, max_tokens = request.max_tokens, "invoking model");

        let mut builder = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                unavailable(format!("timed out after {}s", self.timeout.as_secs()))
            } else {
                unavailable(e.without_url().to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| unavailable(format!("reading response body: {}", e.without_url())))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(model = %model_id, "model invocation throttled");
            return Err(unavailable(format!("throttled: {body}")));
        }
        if !status.is_success() {
            warn!(model = %model_id, status = status.as_u16(), "model invocation failed");
            return Err(unavailable(format!("status {}: {body}", status.as_u16())));
        }

        debug!(model = %model_id, bytes = body.len(), "model responded");
        Ok(body)
    }
}

impl InferenceClient for BedrockClient {
    fn invoke<'a>(
        &'a self,
        model_id: &'a str,
        request: &'a InferenceRequest,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.send(model_id, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use sre_logs::{extract_lines, LogBatch};
    use sre_observe::PromptBuilder;

    const MODEL: &str = "anthropic.claude-3-haiku-20240307-v1:0";

    fn request() -> InferenceRequest {
        let batch = LogBatch::new("/aws/lambda/app", "s").with_messages(["ERROR boom"]);
        PromptBuilder::new().build(&extract_lines(&batch, 30))
    }

    fn client(server: &mockito::Server) -> BedrockClient {
        BedrockClient::new(&server.url(), Duration::from_secs(5)).expect("client builds")
    }

    mod url_tests {
        use super::*;

        #[test]
        fn invoke_url_appends_model_path() {
            let client =
                BedrockClient::new("https://bedrock-runtime.us-east-1.amazonaws.com", Duration::from_secs(1))
                    .expect("client builds");
            let url = client.invoke_url(MODEL).expect("url");
            assert_eq!(
                url.as_str(),
                "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-3-haiku-20240307-v1:0/invoke"
            );
        }

        #[test]
        fn model_id_slashes_are_escaped() {
            let client = BedrockClient::new("http://localhost:8080", Duration::from_secs(1))
                .expect("client builds");
            let url = client
                .invoke_url("arn:aws:bedrock:us-east-1::inference-profile/x")
                .expect("url");
            assert_eq!(
            url.path(),
            "/model/arn:aws:bedrock:us-east-1::inference-profile%2Fx/invoke"
        );
        }

        #[test]
        fn empty_model_id_is_rejected() {
            let client = BedrockClient::new("http://localhost:8080", Duration::from_secs(1))
                .expect("client builds");
            assert!(matches!(
                client.invoke_url(""),
                Err(AssistantError::InferenceUnavailable { .. })
            ));
        }

        #[test]
        fn invalid_endpoint_is_config_error() {
            let err = BedrockClient::new("not a url", Duration::from_secs(1)).unwrap_err();
            assert!(matches!(err, AssistantError::Config(_)));
        }

        #[test]
        fn debug_hides_api_key() {
            let client = BedrockClient::new("http://localhost:8080", Duration::from_secs(1))
                .expect("client builds")
                .with_api_key("bedrock-api-key-abc");
            let debug = format!("{client:?}");
            assert!(!debug.contains("bedrock-api-key-abc"));
            assert!(debug.contains("authenticated: true"));
        }
    }

    mod invoke_tests {
        use super::*;

        #[tokio::test]
        async fn posts_request_body() {
            let mut server = mockito::Server::new_async().await;
            let mock = server
                .mock("POST", format!("/model/{MODEL}/invoke").as_str())
                .match_header("authorization", "Bearer key-123")
                .match_body(Matcher::PartialJson(serde_json::json!({
                    "anthropic_version": "bedrock-2023-05-31",
                    "max_tokens": 800
                })))
                .with_status(200)
                .with_body(r#"{"content":[{"type":"text","text":"{}"}]}"#)
                .expect(1)
                .create_async()
                .await;

            let client = client(&server).with_api_key("key-123");
            let body = client.invoke(MODEL, &request()).await.expect("invokes");

            assert!(body.contains("content"));
            mock.assert_async().await;
        }

        #[tokio::test]
        async fn throttling_is_unavailable() {
            let mut server = mockito::Server::new_async().await;
            let _mock = server
                .mock("POST", Matcher::Any)
                .with_status(429)
                .with_body(r#"{"message":"Too many requests"}"#)
                .create_async()
                .await;

            let err = client(&server).invoke(MODEL, &request()).await.unwrap_err();
            assert!(matches!(err, AssistantError::InferenceUnavailable { ref reason } if reason.starts_with("throttled")));
        }

        #[tokio::test]
        async fn server_error_is_unavailable() {
            let mut server = mockito::Server::new_async().await;
            let _mock = server
                .mock("POST", Matcher::Any)
                .with_status(500)
                .with_body("internal")
                .create_async()
                .await;

            let err = client(&server).invoke(MODEL, &request()).await.unwrap_err();
            assert_eq!(err.to_string(), "inference unavailable: status 500: internal");
        }

        #[tokio::test]
        async fn unreachable_endpoint_is_unavailable() {
            let client = BedrockClient::new("http://127.0.0.1:9", Duration::from_millis(500))
                .expect("client builds");
            let err = client.invoke(MODEL, &request()).await.unwrap_err();
            assert!(matches!(err, AssistantError::InferenceUnavailable { .. }));
        }
    }
}
