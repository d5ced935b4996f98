//! AI provider configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// AI provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// OpenAI API key
    pub openai_api_key: Option<Secret<String>>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on failure, at most [`MAX_RETRIES_LIMIT`]
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Model used to classify utterances against fallback questions
    #[serde(default = "default_auxiliary_model")]
    pub classifier_model: String,

    /// Model used to summarize older turns
    #[serde(default = "default_auxiliary_model")]
    pub summarizer_model: String,
}

/// Upper bound on `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if OpenAI is configured
    pub fn has_openai(&self) -> bool {
        self.openai_api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_openai() {
            return Err(ValidationError::MissingRequired("OSCE_SIM__AI__OPENAI_API_KEY"));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 600 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ValidationError::InvalidMaxRetries(self.max_retries));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ValidationError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.classifier_model.trim().is_empty() {
            return Err(ValidationError::EmptyModel("classifier_model"));
        }
        if self.summarizer_model.trim().is_empty() {
            return Err(ValidationError::EmptyModel("summarizer_model"));
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            classifier_model: default_auxiliary_model(),
            summarizer_model: default_auxiliary_model(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    2
}

fn default_auxiliary_model() -> String {
    "gpt-4o-mini".to_string()
}
