//! Generation client for the LexiLens backend.
//!
//! This crate provides the remote text and image generation capability that
//! the analysis stages are built on:
//!
//! - [`GenerationClient`] - object-safe trait with single-shot, streamed and
//!   JSON completions plus image generation
//! - [`OpenRouterClient`] - implementation over the OpenRouter chat
//!   completions API
//! - [`retry`] - exponential backoff with a pluggable error classifier
//! - [`LlmError`] - the error taxonomy shared by every caller
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use llm::{CompletionRequest, GenerationClient, OpenRouterClient, RemoteLlmConfig};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::from_env(
//!         "OPENROUTER_API_KEY",
//!         llm::config::DEFAULT_BASE_URL,
//!         "anthropic/claude-3.5-sonnet",
//!     )?;
//!     let client = OpenRouterClient::new(config)?;
//!
//!     let request = CompletionRequest::new("Explain the word 'tactic'")
//!         .with_temperature(0.7)
//!         .with_max_tokens(300);
//!
//!     let mut stream = client.stream(request).await?;
//!     while let Some(fragment) = stream.next().await {
//!         print!("{}", fragment?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod sse;

#[cfg(feature = "remote")]
pub mod remote;

// Re-export commonly used types
pub use client::{extract_json, parse_json_response, CompletionRequest, GenerationClient, TextStream};
pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use retry::{RetryConfig, RetryDecision};

#[cfg(feature = "remote")]
pub use remote::OpenRouterClient;
