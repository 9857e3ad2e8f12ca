//! Assistant configuration.
//!
//! Every setting can come from a command-line flag or the environment
//! variable named next to it.

use std::fmt;
use std::time::Duration;

use clap::Args;
use sre_logs::DEFAULT_MAX_LINES;
use sre_notify::ExtensionSecretLookup;
use sre_observe::{PromptBuilder, DEFAULT_LANGUAGE};

use crate::error::{AssistantError, Result};

/// Model used when `BEDROCK_MODEL_ID` is not set.
pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-haiku-20240307-v1:0";

/// Region used when `AWS_REGION` is not set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default inference timeout in seconds.
pub const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 25;

/// Runtime configuration for the pipeline.
#[derive(Clone, Args)]
pub struct AssistantConfig {
    /// Demo table name (accepted, unused).
    #[arg(long, env = "TABLE_NAME")]
    pub table_name: Option<String>,

    /// Secret holding the webhook URL; empty disables delivery.
    #[arg(long, env = "SLACK_WEBHOOK_SECRET_NAME", default_value = "")]
    pub webhook_secret_name: String,

    /// Inference model identifier.
    #[arg(long, env = "BEDROCK_MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// Region of the inference endpoint.
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// Inference endpoint override.
    #[arg(long, env = "BEDROCK_ENDPOINT")]
    pub bedrock_endpoint: Option<String>,

    /// Bearer API key for the inference endpoint.
    #[arg(long, env = "AWS_BEARER_TOKEN_BEDROCK", hide_env_values = true)]
    pub bedrock_api_key: Option<String>,

    /// Inference request timeout in seconds.
    #[arg(long, env = "INFERENCE_TIMEOUT_SECS", default_value_t = DEFAULT_INFERENCE_TIMEOUT_SECS)]
    pub inference_timeout_secs: u64,

    /// Maximum number of log lines sent to the model.
    #[arg(long, env = "MAX_LOG_LINES", default_value_t = DEFAULT_MAX_LINES)]
    pub max_lines: usize,

    /// Language for explanatory prose in the analysis.
    #[arg(long, env = "ANALYSIS_LANGUAGE", default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Secrets extension endpoint.
    #[arg(long, env = "SECRETS_EXTENSION_ENDPOINT", default_value = ExtensionSecretLookup::DEFAULT_ENDPOINT)]
    pub secrets_endpoint: String,

    /// Session token presented to the secrets extension.
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            table_name: None,
            webhook_secret_name: String::new(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            region: DEFAULT_REGION.to_string(),
            bedrock_endpoint: None,
            bedrock_api_key: None,
            inference_timeout_secs: DEFAULT_INFERENCE_TIMEOUT_SECS,
            max_lines: DEFAULT_MAX_LINES,
            language: DEFAULT_LANGUAGE.to_string(),
            secrets_endpoint: ExtensionSecretLookup::DEFAULT_ENDPOINT.to_string(),
            session_token: None,
        }
    }
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("table_name", &self.table_name)
            .field("webhook_secret_name", &self.webhook_secret_name)
            .field("model_id", &self.model_id)
            .field("region", &self.region)
            .field("bedrock_endpoint", &self.bedrock_endpoint)
            .field("bedrock_api_key", &self.bedrock_api_key.as_ref().map(|_| "<redacted>"))
            .field("inference_timeout_secs", &self.inference_timeout_secs)
            .field("max_lines", &self.max_lines)
            .field("language", &self.language)
            .field("secrets_endpoint", &self.secrets_endpoint)
            .finish_non_exhaustive()
    }
}

impl AssistantConfig {
    /// Sets the webhook secret reference.
    #[must_use]
    pub fn with_webhook_secret_name(mut self, name: impl Into<String>) -> Self {
        self.webhook_secret_name = name.into();
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Sets the line cap.
    #[must_use]
    pub const fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    /// Sets the inference endpoint.
    #[must_use]
    pub fn with_bedrock_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.bedrock_endpoint = Some(endpoint.into());
        self
    }

    /// Returns true if a webhook secret reference is configured.
    #[must_use]
    pub fn delivery_enabled(&self) -> bool {
        !self.webhook_secret_name.trim().is_empty()
    }

    /// Returns the inference endpoint, derived from the region unless overridden.
    #[must_use]
    pub fn inference_endpoint(&self) -> String {
        self.bedrock_endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", self.region))
    }

    /// Returns the inference timeout.
    #[must_use]
    pub const fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    /// Returns a prompt builder configured for this deployment.
    #[must_use]
    pub fn prompt_builder(&self) -> PromptBuilder {
        PromptBuilder::new().with_language(&self.language)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError::Config` if any value is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(AssistantError::Config(
                "model id cannot be empty".to_string(),
            ));
        }

        if self.max_lines == 0 {
            return Err(AssistantError::Config(
                "max_lines must be greater than 0".to_string(),
            ));
        }

        if self.inference_timeout_secs == 0 {
            return Err(AssistantError::Config(
                "inference timeout must be greater than 0".to_string(),
            ));
        }

        if self.bedrock_endpoint.is_none() && self.region.trim().is_empty() {
            return Err(AssistantError::Config(
                "region is required when no endpoint override is set".to_string(),
            ));
        }

        if self.language.trim().is_empty() {
            return Err(AssistantError::Config(
                "analysis language cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
