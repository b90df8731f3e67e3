//! Remote generation providers.
//!
//! - **OpenRouter** - unified, OpenAI-compatible API in front of many vendors

pub mod openrouter;

pub use openrouter::OpenRouterClient;
