//! Word analysis endpoint handlers
//!
//! The streaming endpoint runs every requested stage; the mistakes endpoint
//! lets the client load the third stage lazily.

use axum::{extract::rejection::JsonRejection, extract::State, response::Response, Json};

use crate::api::{
    error::{ApiError, ApiResult, MISTAKES_LABELS},
    middleware::{json_body, validate_word_and_context},
    routes::AppState,
    sse::sse_response,
};
use crate::models::{AnalysisRequest, Layer3Response, MistakesRequest};
use crate::stages::DEFAULT_MAX_MISTAKES;

/// Stream a full analysis as server-sent events
///
/// POST /api/analyze
pub async fn analyze_word(
    State(app_state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = json_body(payload)?;
    validate_word_and_context(&request.word, &request.context)?;

    tracing::info!(
        "Analyzing word: '{}' with context length: {}",
        request.word,
        request.context.len()
    );

    let events = app_state.orchestrator.analyze(request);
    Ok(sse_response(events))
}

/// Common mistakes only, as JSON
///
/// POST /api/analyze/mistakes
pub async fn analyze_mistakes(
    State(app_state): State<AppState>,
    payload: Result<Json<MistakesRequest>, JsonRejection>,
) -> ApiResult<Json<Layer3Response>> {
    let request = json_body(payload)?;
    validate_word_and_context(&request.word, &request.context)?;

    tracing::info!(
        "Generating common mistakes for word='{}' (level={:?})",
        request.word,
        request.english_level
    );

    let mistakes = app_state
        .stages
        .generate_layer3(
            &request.word,
            &request.context,
            request.english_level.as_deref(),
            request.max_items.unwrap_or(DEFAULT_MAX_MISTAKES),
        )
        .await
        .map_err(|e| ApiError::from_generation(MISTAKES_LABELS, e))?;

    Ok(Json(mistakes))
}
