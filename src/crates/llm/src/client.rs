//! The generation capability consumed by stage functions.

use crate::error::{LlmError, Result};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::pin::Pin;

/// Incremental text fragments of a streamed completion.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A single-prompt completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Overrides the client's configured default model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Vendor parameters merged into the upstream body as-is.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 1000,
            model: None,
            extra: Map::new(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Merge a vendor parameter into the request body.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Merge every key of `params` into the request body.
    pub fn with_extra_params(mut self, params: Map<String, Value>) -> Self {
        self.extra.extend(params);
        self
    }
}

/// Remote text and image generation.
///
/// Implementations retry rate-limit and connectivity failures internally and
/// surface an [`LlmError`] once the retry budget is spent.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Single-shot completion returning the full text.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Token-streamed completion.
    ///
    /// Opening the stream is retried; once fragments flow, errors are yielded
    /// as the final item.
    async fn stream(&self, request: CompletionRequest) -> Result<TextStream>;

    /// Generate an image and return its URL (or data URL).
    async fn generate_image(&self, prompt: &str) -> Result<String>;

    /// Completion parsed as JSON.
    async fn complete_json(&self, request: CompletionRequest) -> Result<Value> {
        let text = self.complete(request).await?;
        parse_json_response(&text)
    }
}

/// Locate the JSON payload inside a model response.
///
/// Handles ```json fences, bare ``` fences and prose around a single object
/// or array.
pub fn extract_json(text: &str) -> Option<&str> {
    let text = text.trim();

    for fence in ["```json", "```JSON"] {
        if let Some(start) = text.find(fence) {
            let content = &text[start + fence.len()..];
            let end = content.find("```").unwrap_or(content.len());
            return Some(content[..end].trim());
        }
    }

    if let Some(content) = text.strip_prefix("```") {
        let end = content.find("```").unwrap_or(content.len());
        return Some(content[..end].trim());
    }

    if text.starts_with('{') || text.starts_with('[') {
        return Some(text);
    }

    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| text[start..=end].trim())
}

/// Parse a model response as JSON, tolerating fences and annotations.
pub fn parse_json_response(text: &str) -> Result<Value> {
    let candidate = extract_json(text)
        .ok_or_else(|| LlmError::malformed("Invalid JSON response: no JSON found in response"))?;
    serde_json::from_str(candidate).map_err(LlmError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let req = CompletionRequest::new("Explain 'tactic'")
            .with_system_prompt(Some("You are a tutor".into()))
            .with_temperature(0.8)
            .with_max_tokens(600)
            .with_model(Some("fast/model".into()))
            .with_extra("reasoning", json!({"effort": "medium"}));

        assert_eq!(req.temperature, 0.8);
        assert_eq!(req.max_tokens, 600);
        assert_eq!(req.model.as_deref(), Some("fast/model"));
        assert_eq!(req.extra["reasoning"]["effort"], "medium");
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_json_bare_fence() {
        let text = "```\n[1, 2]\n```";
        assert_eq!(extract_json(text), Some("[1, 2]"));
    }

    #[test]
    fn test_extract_json_with_prose() {
        let text = "Here you go:\n[{\"wrong\": \"x\"}]\nHope it helps.";
        assert_eq!(extract_json(text), Some("[{\"wrong\": \"x\"}]"));
    }

    #[test]
    fn test_extract_json_none() {
        assert_eq!(extract_json("no structured data here"), None);
    }

    #[test]
    fn test_parse_json_response() {
        let value = parse_json_response("```json\n{\"related_words\": []}\n```").unwrap();
        assert_eq!(value, json!({"related_words": []}));
    }

    #[test]
    fn test_parse_json_response_malformed() {
        let err = parse_json_response("{not valid").unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }
}
