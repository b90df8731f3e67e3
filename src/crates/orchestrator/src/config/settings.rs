//! Service settings for lexilens-server
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables (a `.env` file in the working directory is honoured).

use llm::{RemoteLlmConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use super::routing::ModelRouting;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Upstream generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterSettings {
    pub api_key: String,
    pub model_id: String,
    pub base_url: String,
    pub fast_model_id: Option<String>,
    pub layer3_model_id: Option<String>,
    pub layer4_fast_model_id: Option<String>,
    pub layer4_main_model_id: Option<String>,
    pub image_model_id: Option<String>,
    pub layer3_thinking_enabled: bool,
    pub layer4_thinking_enabled: bool,
}

impl Default for OpenRouterSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model_id: "anthropic/claude-3.5-sonnet".to_string(),
            base_url: llm::config::DEFAULT_BASE_URL.to_string(),
            fast_model_id: None,
            layer3_model_id: None,
            layer4_fast_model_id: None,
            layer4_main_model_id: None,
            image_model_id: None,
            layer3_thinking_enabled: false,
            layer4_thinking_enabled: false,
        }
    }
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed origins; a trailing `*` matches any suffix
    pub cors_origins: Vec<String>,
    pub log_level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "chrome-extension://*".to_string(),
                "http://localhost:5173".to_string(),
            ],
            log_level: "info".to_string(),
        }
    }
}

/// Outbound call policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Total attempts per call, first one included
    pub max_retries: u32,
    /// Initial backoff in seconds
    pub retry_delay: f64,
    /// Per-request timeout in seconds
    pub request_timeout: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: 1.0,
            request_timeout: 60,
        }
    }
}

/// Peripheral lookups and their caches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSettings {
    pub image_cache_ttl_secs: u64,
    pub pronunciation_cache_ttl_secs: u64,
    pub pronunciation_base_url: String,
    pub pronunciation_timeout_secs: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            image_cache_ttl_secs: 6 * 60 * 60,
            pronunciation_cache_ttl_secs: 24 * 60 * 60,
            pronunciation_base_url: "https://api.dictionaryapi.dev/api/v2/entries/en".to_string(),
            pronunciation_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub openrouter: OpenRouterSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub lookups: LookupSettings,
}

impl Settings {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings for the server process
    ///
    /// Searches for a config file in:
    /// 1. LEXILENS_CONFIG environment variable
    /// 2. ./config/lexilens.toml
    ///
    /// Falls back to defaults when neither exists, then applies environment
    /// overrides and validates.
    pub fn load() -> Result<Self, SettingsError> {
        // Missing .env is normal outside development
        let _ = dotenvy::dotenv();

        let mut settings = match std::env::var("LEXILENS_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => {
                let default_path = PathBuf::from("config/lexilens.toml");
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply process environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), SettingsError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    ///
    /// Supported variables: OPENROUTER_API_KEY, OPENROUTER_MODEL_ID,
    /// OPENROUTER_BASE_URL, OPENROUTER_FAST_MODEL_ID,
    /// OPENROUTER_LAYER3_MODEL_ID, OPENROUTER_LAYER4_FAST_MODEL_ID,
    /// OPENROUTER_LAYER4_MAIN_MODEL_ID, OPENROUTER_IMAGE_MODEL_ID,
    /// OPENROUTER_LAYER3_THINKING_ENABLED, OPENROUTER_LAYER4_THINKING_ENABLED,
    /// API_HOST, API_PORT, CORS_ORIGINS, LOG_LEVEL, MAX_RETRIES, RETRY_DELAY,
    /// REQUEST_TIMEOUT, IMAGE_CACHE_TTL_SECS, PRONUNCIATION_CACHE_TTL_SECS,
    /// PRONUNCIATION_BASE_URL.
    ///
    /// A numeric variable that does not parse is an error, not a silent skip.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = &mut self.openrouter;
        if let Some(v) = lookup("OPENROUTER_API_KEY") {
            or.api_key = v;
        }
        if let Some(v) = lookup("OPENROUTER_MODEL_ID") {
            or.model_id = v;
        }
        if let Some(v) = lookup("OPENROUTER_BASE_URL") {
            or.base_url = v;
        }
        override_optional(&mut or.fast_model_id, lookup("OPENROUTER_FAST_MODEL_ID"));
        override_optional(&mut or.layer3_model_id, lookup("OPENROUTER_LAYER3_MODEL_ID"));
        override_optional(&mut or.layer4_fast_model_id, lookup("OPENROUTER_LAYER4_FAST_MODEL_ID"));
        override_optional(&mut or.layer4_main_model_id, lookup("OPENROUTER_LAYER4_MAIN_MODEL_ID"));
        override_optional(&mut or.image_model_id, lookup("OPENROUTER_IMAGE_MODEL_ID"));
        if let Some(v) = lookup("OPENROUTER_LAYER3_THINKING_ENABLED") {
            or.layer3_thinking_enabled = parse_flag(&v);
        }
        if let Some(v) = lookup("OPENROUTER_LAYER4_THINKING_ENABLED") {
            or.layer4_thinking_enabled = parse_flag(&v);
        }

        let server = &mut self.server;
        if let Some(v) = lookup("API_HOST") {
            server.host = v;
        }
        if let Some(port) = parse_var(&lookup, "API_PORT")? {
            server.port = port;
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            server.cors_origins = parse_origins(&v);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            server.log_level = v.to_lowercase();
        }

        let generation = &mut self.generation;
        if let Some(v) = parse_var(&lookup, "MAX_RETRIES")? {
            generation.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "RETRY_DELAY")? {
            generation.retry_delay = v;
        }
        if let Some(v) = parse_var(&lookup, "REQUEST_TIMEOUT")? {
            generation.request_timeout = v;
        }

        let lookups = &mut self.lookups;
        if let Some(v) = parse_var(&lookup, "IMAGE_CACHE_TTL_SECS")? {
            lookups.image_cache_ttl_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "PRONUNCIATION_CACHE_TTL_SECS")? {
            lookups.pronunciation_cache_ttl_secs = v;
        }
        if let Some(v) = lookup("PRONUNCIATION_BASE_URL") {
            lookups.pronunciation_base_url = v;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.openrouter.api_key.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "OPENROUTER_API_KEY is required".to_string(),
            ));
        }
        if self.openrouter.model_id.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "Model identifier cannot be empty".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(SettingsError::InvalidConfig(
                "API port must be greater than 0".to_string(),
            ));
        }
        if self.generation.request_timeout == 0 {
            return Err(SettingsError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }
        if !self.generation.retry_delay.is_finite() || self.generation.retry_delay < 0.0 {
            return Err(SettingsError::InvalidConfig(format!(
                "Retry delay must be a non-negative number, got {}",
                self.generation.retry_delay
            )));
        }
        Ok(())
    }

    pub fn model_routing(&self) -> ModelRouting {
        let or = &self.openrouter;
        ModelRouting {
            default_model: or.model_id.clone(),
            fast_model: or.fast_model_id.clone(),
            layer3_model: or.layer3_model_id.clone(),
            layer4_fast_model: or.layer4_fast_model_id.clone(),
            layer4_main_model: or.layer4_main_model_id.clone(),
            layer3_thinking: or.layer3_thinking_enabled,
            layer4_thinking: or.layer4_thinking_enabled,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from_attempts(self.generation.max_retries)
            .with_initial_backoff((self.generation.retry_delay * 1000.0) as u64)
    }

    pub fn llm_config(&self) -> RemoteLlmConfig {
        let mut config = RemoteLlmConfig::new(
            self.openrouter.api_key.clone(),
            self.openrouter.base_url.clone(),
            self.openrouter.model_id.clone(),
        )
        .with_timeout(Duration::from_secs(self.generation.request_timeout))
        .with_retry(self.retry_config())
        .with_app("LexiLens", "https://lexilens.app");

        if let Some(image_model) = &self.openrouter.image_model_id {
            config = config.with_image_model(image_model.clone());
        }
        config
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn image_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.lookups.image_cache_ttl_secs)
    }

    pub fn pronunciation_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.lookups.pronunciation_cache_ttl_secs)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>, SettingsError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim().parse().map_err(|e| {
                SettingsError::InvalidConfig(format!("{name} must be a number, got {raw:?}: {e}"))
            })
        })
        .transpose()
}

fn override_optional(slot: &mut Option<String>, value: Option<String>) {
    if let Some(v) = value {
        let v = v.trim().to_string();
        *slot = (!v.is_empty()).then_some(v);
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1" || value.eq_ignore_ascii_case("yes")
}

/// Accepts a comma separated list or a JSON array.
fn parse_origins(value: &str) -> Vec<String> {
    let value = value.trim();
    if value.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(value) {
            return list;
        }
    }
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
