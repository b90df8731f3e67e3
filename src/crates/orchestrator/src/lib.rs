//! LexiLens analysis service
//!
//! Turns a single word lookup into a multi-stage, partially streamed
//! explanation: word sense, example contexts, common mistakes and related
//! words, personalized to the learner's history and interests.
//!
//! - [`stages`]: one validated generation call per stage
//! - [`execution`]: the streaming orchestrator merging concurrent stages into
//!   one ordered event feed
//! - [`api`]: axum router, SSE transport and the synchronous endpoints
//! - [`config`]: settings and per-stage model routing

pub mod api;
pub mod cache;
pub mod config;
pub mod execution;
pub mod models;
pub mod prompts;
pub mod services;
pub mod stages;

use thiserror::Error;

pub use execution::{AnalysisEvent, AnalysisOrchestrator, AnalysisStream};
pub use stages::{LexiStages, StageGenerator};

/// Errors that can occur while serving an analysis request
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A generation call failed
    #[error(transparent)]
    Generation(#[from] llm::LlmError),

    /// Invalid or missing settings
    #[error("Configuration error: {0}")]
    Config(#[from] config::SettingsError),

    /// The event consumer went away
    #[error("Client disconnected")]
    ClientDisconnected,

    /// General error
    #[error("Orchestrator error: {0}")]
    General(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_is_transparent() {
        let err: OrchestratorError = llm::LlmError::malformed("Layer 2 response must be a list of 3 contexts").into();
        assert_eq!(err.to_string(), "Layer 2 response must be a list of 3 contexts");
    }

    #[test]
    fn test_config_error_message() {
        let err: OrchestratorError =
            config::SettingsError::InvalidConfig("OPENROUTER_API_KEY is required".into()).into();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }
}
