//! Configuration for the remote generation service.

use crate::error::{LlmError, Result};
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenRouter API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Configuration for an OpenAI-compatible remote provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API, without the `/chat/completions` suffix.
    pub base_url: String,

    /// Default model identifier used when a request carries no override.
    pub model: String,

    /// Model used for image generation.
    #[serde(default)]
    pub image_model: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Retry policy applied to every outbound call.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Sent as `HTTP-Referer` / `X-Title` for OpenRouter attribution.
    #[serde(default)]
    pub app_name: Option<String>,

    #[serde(default)]
    pub app_url: Option<String>,
}

impl RemoteLlmConfig {
    /// Create a new remote configuration.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            image_model: None,
            timeout: default_timeout(),
            retry: RetryConfig::default(),
            app_name: None,
            app_url: None,
        }
    }

    /// Create configuration with the key read from an environment variable.
    pub fn from_env(
        env_var: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(env_var)
            .map_err(|_| LlmError::Config(format!("Environment variable not set: {}", env_var)))?;

        Ok(Self::new(api_key, base_url, model))
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the image model.
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    /// Set attribution headers.
    pub fn with_app(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self.app_url = Some(url.into());
        self
    }

    /// Reject configurations that cannot possibly work.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::Config("API key is required".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(LlmError::Config("Base URL cannot be empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(LlmError::Config("Model identifier cannot be empty".to_string()));
        }
        Ok(())
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_config_builder() {
        let config = RemoteLlmConfig::new("test-key", DEFAULT_BASE_URL, "anthropic/claude-3.5-sonnet")
            .with_timeout(Duration::from_secs(120))
            .with_image_model("google/gemini-2.5-flash-image")
            .with_app("LexiLens", "https://lexilens.app");

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.image_model.as_deref(), Some("google/gemini-2.5-flash-image"));
        assert_eq!(config.app_name.as_deref(), Some("LexiLens"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_key() {
        let config = RemoteLlmConfig::new("  ", DEFAULT_BASE_URL, "m");
        assert!(matches!(config.validate(), Err(LlmError::Config(_))));
    }

    #[test]
    fn test_completions_url_trims_slash() {
        let config = RemoteLlmConfig::new("k", "https://openrouter.ai/api/v1/", "m");
        assert_eq!(
            config.completions_url(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }
}
