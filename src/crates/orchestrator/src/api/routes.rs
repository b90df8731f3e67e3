//! API route definitions
//!
//! Defines all API routes and their associated handler functions.

use axum::{
    routing::{get, post},
    Router,
};
use llm::{GenerationClient, OpenRouterClient};
use std::sync::Arc;
use std::time::Duration;

use crate::api::handlers;
use crate::api::middleware::{cors_layer, logging_layer};
use crate::cache::{InMemoryTtlCache, TtlCache};
use crate::config::Settings;
use crate::execution::AnalysisOrchestrator;
use crate::models::LexicalImageResponse;
use crate::services::PronunciationService;
use crate::stages::{LexiStages, StageGenerator};
use crate::{OrchestratorError, Result};

/// Image cache keyed by the lower-cased (base word, related word) pair
pub type ImageCache = Arc<dyn TtlCache<(String, String), LexicalImageResponse>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub stages: Arc<dyn StageGenerator>,
    pub orchestrator: AnalysisOrchestrator,
    pub image_cache: ImageCache,
    pub pronunciation: PronunciationService,
}

impl AppState {
    pub fn new(
        stages: Arc<dyn StageGenerator>,
        image_cache: ImageCache,
        pronunciation: PronunciationService,
    ) -> Self {
        Self {
            orchestrator: AnalysisOrchestrator::new(stages.clone()),
            stages,
            image_cache,
            pronunciation,
        }
    }

    /// Wire the production collaborators from settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let client: Arc<dyn GenerationClient> =
            Arc::new(OpenRouterClient::new(settings.llm_config())?);
        let stages: Arc<dyn StageGenerator> =
            Arc::new(LexiStages::new(client, settings.model_routing()));

        let image_cache: ImageCache = Arc::new(InMemoryTtlCache::new(settings.image_cache_ttl()));
        let pronunciation = PronunciationService::new(
            settings.lookups.pronunciation_base_url.clone(),
            Duration::from_secs(settings.lookups.pronunciation_timeout_secs),
            Arc::new(InMemoryTtlCache::new(settings.pronunciation_cache_ttl())),
        )
        .map_err(|e| OrchestratorError::General(e.to_string()))?;

        Ok(Self::new(stages, image_cache, pronunciation))
    }
}

/// Build the complete API router
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        // Status endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Analysis endpoints
        .route("/api/analyze", post(handlers::analyze_word))
        .route("/api/analyze/mistakes", post(handlers::analyze_mistakes))
        // Lexical map endpoints
        .route(
            "/api/lexical-map/text",
            post(handlers::generate_lexical_map_text),
        )
        .route(
            "/api/lexical-map/image",
            post(handlers::generate_lexical_image),
        )
        // Interest endpoints
        .route(
            "/api/interests/from-usage",
            post(handlers::summarize_interests_from_usage),
        )
        // Pronunciation endpoint
        .route(
            "/api/pronunciation/:word",
            get(handlers::get_pronunciation),
        )
        .with_state(app_state)
}

/// Router with CORS and request tracing applied
pub fn build_app<S: AsRef<str>>(app_state: AppState, cors_origins: &[S]) -> Router {
    create_router(app_state)
        .layer(cors_layer(cors_origins))
        .layer(logging_layer())
}
