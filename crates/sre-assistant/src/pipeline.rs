//! The log-to-insight pipeline.
//!
//! One invocation runs decode, extract, prompt, infer, parse, format and
//! deliver in order. Any failure before delivery aborts the invocation
//! without sending anything.

use std::sync::Arc;

use serde::Serialize;
use sre_logs::{
    decode_envelope, decode_payload, extract_lines, ExtractedLines, InboundEvent, LogBatch,
};
use sre_notify::{
    DeliveryReceipt, ExtensionSecretLookup, NotificationTransport, SecretLookup,
    SlackWebhookTransport, WebhookUrlCache,
};
use sre_observe::{
    format_notification, parse_response, AnalysisResult, InferenceRequest, NotificationMessage,
    PromptBuilder, Severity, SourceMeta,
};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::inference::{BedrockClient, InferenceClient};

/// Why a notification was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No webhook secret reference is configured.
    NotConfigured,
    /// The secret exists but holds no webhook URL.
    NoWebhookUrl,
    /// The batch was a control message; nothing was analyzed.
    ControlMessage,
}

/// Delivery outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    /// The transport accepted the message.
    Sent {
        /// Transport receipt.
        receipt: DeliveryReceipt,
    },
    /// Delivery was skipped.
    Skipped {
        /// Why nothing was sent.
        reason: SkipReason,
    },
}

impl Delivery {
    /// Returns true if the message was sent.
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Summary of one completed invocation.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationReport {
    /// Unique id, also recorded on the invocation's tracing span.
    pub invocation_id: Uuid,
    /// Source log group.
    pub log_group: String,
    /// Source log stream.
    pub log_stream: String,
    /// Number of lines sent for analysis.
    pub lines_analyzed: usize,
    /// Overall severity, when an analysis was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Delivery outcome.
    pub delivery: Delivery,
    /// The structured analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    /// The rendered notification text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<NotificationMessage>,
}

/// A decoded batch ready for inference.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// The decoded batch.
    pub batch: LogBatch,
    /// The lines sent for analysis.
    pub lines: ExtractedLines,
    /// The request body.
    pub request: InferenceRequest,
}

/// Runs invocations against a fixed set of collaborators.
///
/// The resolved webhook URL is cached for the lifetime of the pipeline, so
/// the secret is looked up at most once per successful resolution.
#[derive(Debug)]
pub struct Pipeline {
    config: AssistantConfig,
    prompt: PromptBuilder,
    inference: Arc<dyn InferenceClient>,
    secrets: Arc<dyn SecretLookup>,
    transport: Arc<dyn NotificationTransport>,
    webhook: WebhookUrlCache,
}

impl Pipeline {
    /// Creates a pipeline with explicit collaborators.
    #[must_use]
    pub fn new(
        config: AssistantConfig,
        inference: Arc<dyn InferenceClient>,
        secrets: Arc<dyn SecretLookup>,
        transport: Arc<dyn NotificationTransport>,
    ) -> Self {
        let prompt = config.prompt_builder();
        let webhook = WebhookUrlCache::new(config.webhook_secret_name.trim());
        Self {
            config,
            prompt,
            inference,
            secrets,
            transport,
            webhook,
        }
    }

    /// Creates a pipeline wired to Bedrock, the secrets extension and Slack.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError::Config` if the configuration is invalid or a
    /// client cannot be built.
    pub fn from_config(config: AssistantConfig) -> Result<Self> {
        config.validate()?;

        let inference = BedrockClient::from_config(&config)?;
        let secrets = ExtensionSecretLookup::new(config.session_token.clone().unwrap_or_default())
            .map_err(|e| AssistantError::Config(e.to_string()))?
            .with_endpoint(config.secrets_endpoint.clone());
        let transport =
            SlackWebhookTransport::new().map_err(|e| AssistantError::Config(e.to_string()))?;

        Ok(Self::new(
            config,
            Arc::new(inference),
            Arc::new(secrets),
            Arc::new(transport),
        ))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Decodes `event` and builds the inference request without calling any
    /// collaborator.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError::MalformedPayload` if the payload cannot be decoded.
    pub fn prepare(&self, event: &InboundEvent) -> Result<PreparedRequest> {
        let batch = decode_payload(event)?;
        Ok(self.prepare_batch(batch))
    }

    fn prepare_batch(&self, batch: LogBatch) -> PreparedRequest {
        let lines = extract_lines(&batch, self.config.max_lines);
        let request = self.prompt.build(&lines);
        PreparedRequest {
            batch,
            lines,
            request,
        }
    }

    /// Handles a raw JSON invocation event.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::handle`].
    pub async fn handle_json(&self, raw: &str) -> Result<InvocationReport> {
        let batch = decode_envelope(raw)?;
        self.run(batch).await
    }

    /// Handles one inbound event.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; nothing is delivered in that case.
    pub async fn handle(&self, event: &InboundEvent) -> Result<InvocationReport> {
        let batch = decode_payload(event)?;
        self.run(batch).await
    }

    async fn run(&self, batch: LogBatch) -> Result<InvocationReport> {
        let invocation_id = Uuid::new_v4();
        let span = info_span!(
            "invocation",
            id = %invocation_id,
            log_group = %batch.log_group,
            log_stream = %batch.log_stream,
        );

        let result = self.process(invocation_id, batch).instrument(span.clone()).await;
        if let Err(e) = &result {
            span.in_scope(|| error!(kind = e.kind(), error = %e, "invocation failed"));
        }
        result
    }

    async fn process(&self, invocation_id: Uuid, batch: LogBatch) -> Result<InvocationReport> {
        info!(events = batch.len(), "received log batch");

        if batch.is_control_message() {
            info!("control message, nothing to analyze");
            return Ok(InvocationReport {
                invocation_id,
                log_group: batch.log_group,
                log_stream: batch.log_stream,
                lines_analyzed: 0,
                severity: None,
                delivery: Delivery::Skipped {
                    reason: SkipReason::ControlMessage,
                },
                analysis: None,
                message: None,
            });
        }

        let PreparedRequest {
            batch,
            lines,
            request,
        } = self.prepare_batch(batch);
        if lines.is_empty() {
            warn!("batch contains no non-empty lines");
        }
        debug!(lines = lines.len(), cap = self.config.max_lines, "extracted lines");

        let raw = self.inference.invoke(&self.config.model_id, &request).await?;
        let analysis = parse_response(&raw)?;
        info!(
            severity = %analysis.severity(),
            hypotheses = analysis.hypotheses.len(),
            actions = analysis.recommended_actions.len(),
            "analysis complete"
        );

        let source = SourceMeta::new(&batch.log_group, &batch.log_stream);
        let message = format_notification(&analysis, &source);
        let delivery = self.deliver(&message).await?;

        Ok(InvocationReport {
            invocation_id,
            log_group: batch.log_group,
            log_stream: batch.log_stream,
            lines_analyzed: lines.len(),
            severity: Some(analysis.severity()),
            delivery,
            analysis: Some(analysis),
            message: Some(message),
        })
    }

    async fn deliver(&self, message: &NotificationMessage) -> Result<Delivery> {
        if !self.webhook.is_configured() {
            info!("no webhook secret configured, skipping delivery");
            return Ok(Delivery::Skipped {
                reason: SkipReason::NotConfigured,
            });
        }

        let url = self
            .webhook
            .resolve(self.secrets.as_ref())
            .await
            .map_err(AssistantError::SecretLookup)?;

        let Some(url) = url else {
            warn!(secret = %self.webhook.secret_name(), "secret has no webhook url, skipping delivery");
            return Ok(Delivery::Skipped {
                reason: SkipReason::NoWebhookUrl,
            });
        };

        let receipt = self
            .transport
            .deliver(url, message.as_str())
            .await
            .map_err(AssistantError::Delivery)?;

        Ok(Delivery::Sent { receipt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_serializes_with_status_tag() {
        let sent = Delivery::Sent {
            receipt: DeliveryReceipt::new("slack", 200),
        };
        assert_eq!(
            serde_json::to_value(&sent).expect("serializes"),
            serde_json::json!({"status": "sent", "receipt": {"channel": "slack", "status_code": 200}})
        );

        let skipped = Delivery::Skipped {
            reason: SkipReason::NoWebhookUrl,
        };
        assert_eq!(
            serde_json::to_value(&skipped).expect("serializes"),
            serde_json::json!({"status": "skipped", "reason": "no_webhook_url"})
        );
        assert!(sent.is_sent());
        assert!(!skipped.is_sent());
    }

    #[test]
    fn from_config_rejects_invalid_config() {
        let err = Pipeline::from_config(AssistantConfig::default().with_max_lines(0)).unwrap_err();
        assert!(matches!(err, AssistantError::Config(_)));
    }

    #[test]
    fn prepare_applies_line_cap() {
        let pipeline = Pipeline::from_config(
            AssistantConfig::default()
                .with_max_lines(2)
                .with_bedrock_endpoint("http://localhost:8080"),
        )
        .expect("pipeline builds");
        let batch = LogBatch::new("/aws/lambda/app", "s").with_messages(["a", "b", "c"]);
        let event = sre_logs::encode_payload(&batch).expect("encodes");

        let prepared = pipeline.prepare(&event).expect("prepares");
        assert_eq!(prepared.lines.as_slice(), ["b", "c"]);
        assert!(prepared.request.user_text().is_some_and(|t| t.contains("\"c\"")));
    }
}
