//! OpenRouter client implementation.
//!
//! OpenRouter exposes an OpenAI-compatible chat completions API that routes
//! requests to many model vendors. This client speaks that API directly over
//! `reqwest`, with streaming and image output on top of plain completions.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{CompletionRequest, GenerationClient, OpenRouterClient, RemoteLlmConfig};
//!
//! let config = RemoteLlmConfig::from_env(
//!     "OPENROUTER_API_KEY",
//!     "https://openrouter.ai/api/v1",
//!     "anthropic/claude-3.5-sonnet",
//! )?;
//! let client = OpenRouterClient::new(config)?;
//!
//! let text = client.complete(CompletionRequest::new("Define 'tactic'")).await?;
//! ```

use crate::client::{CompletionRequest, GenerationClient, TextStream};
use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::retry::{classify, retry_with_backoff};
use crate::sse::{ChunkDecoder, StreamFrame};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Delay assumed when a 429 carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// OpenRouter API client.
#[derive(Clone)]
pub struct OpenRouterClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &RemoteLlmConfig {
        &self.config
    }

    fn build_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequestBody {
            model: request.model.as_deref().unwrap_or(&self.config.model),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };

        let mut value = serde_json::to_value(body).unwrap_or_else(|_| Value::Object(Map::new()));
        if let Value::Object(map) = &mut value {
            for (key, extra) in &request.extra {
                map.insert(key.clone(), extra.clone());
            }
        }
        value
    }

    /// Issue one POST and turn non-success statuses into typed errors.
    async fn post(&self, body: &Value) -> Result<Response> {
        let mut req = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(body);

        if let Some(url) = &self.config.app_url {
            req = req.header("HTTP-Referer", url);
        }
        if let Some(name) = &self.config.app_name {
            req = req.header("X-Title", name);
        }

        let response = req.send().await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Map an unsuccessful upstream response onto the error taxonomy.
async fn error_from_response(response: Response) -> LlmError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let body = response.text().await.unwrap_or_default();
    let message = upstream_message(&body);

    error_for_status(status, message, retry_after)
}

fn error_for_status(status: StatusCode, message: String, retry_after: Option<Duration>) -> LlmError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        LlmError::rate_limited(message, Some(retry_after.unwrap_or(DEFAULT_RETRY_AFTER)))
    } else if status.is_server_error() {
        LlmError::Connection(format!("Server error: {}", message))
    } else {
        LlmError::Upstream {
            status: status.as_u16(),
            message,
        }
    }
}

/// Prefer the vendor's `error.message`, fall back to the raw body.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| "Unknown error".to_string())
}

fn completion_text(response: ChatResponseBody) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::malformed("Completion response contained no message content"))
}

fn image_url(response: ChatResponseBody) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.images.into_iter().next())
        .map(|img| img.image_url.url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| LlmError::malformed("Image generation response contained no image"))
}

#[async_trait]
impl GenerationClient for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = self.build_body(&request, false);
        debug!(model = %body["model"], "Sending completion request");

        retry_with_backoff(&self.config.retry, "openrouter.complete", classify, || async {
            let response = self.post(&body).await?;
            let parsed: ChatResponseBody = response.json().await?;
            completion_text(parsed)
        })
        .await
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TextStream> {
        let body = self.build_body(&request, true);
        debug!(model = %body["model"], "Opening completion stream");

        let response =
            retry_with_backoff(&self.config.retry, "openrouter.stream", classify, || {
                self.post(&body)
            })
            .await?;

        let stream = async_stream::stream! {
            let mut bytes = response.bytes_stream();
            let mut decoder = ChunkDecoder::new();
            let mut received_any = false;
            let mut finished = false;

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LlmError::from(e));
                        return;
                    }
                };
                for frame in decoder.push(&chunk) {
                    match frame {
                        StreamFrame::Content(text) => {
                            received_any = true;
                            yield Ok(text);
                        }
                        StreamFrame::Done => finished = true,
                    }
                }
                if finished {
                    break;
                }
            }

            if !finished {
                if let Some(StreamFrame::Content(text)) = decoder.finish() {
                    received_any = true;
                    yield Ok(text);
                }
            }

            if !received_any {
                warn!("Completion stream ended without content");
                yield Err(LlmError::EmptyResult("No content received from stream".to_string()));
            }
        };

        Ok(Box::pin(stream))
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let model = self
            .config
            .image_model
            .as_deref()
            .unwrap_or(&self.config.model);

        let body = serde_json::json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "modalities": ["image", "text"],
        });
        debug!(model = model, "Sending image generation request");

        retry_with_backoff(&self.config.retry, "openrouter.image", classify, || async {
            let response = self.post(&body).await?;
            let parsed: ChatResponseBody = response.json().await?;
            image_url(parsed)
        })
        .await
    }
}

// OpenRouter API types (OpenAI-compatible with extensions)
#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Vec<ChoiceImage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceImage {
    image_url: ImageUrl,
}

#[derive(Debug, Deserialize)]
struct ImageUrl {
    url: String,
}
