//! Interest topic endpoint handlers

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::api::{
    error::{ApiError, ApiResult, INTERESTS_LABELS},
    middleware::{json_body, validate_word_and_context},
    routes::AppState,
};
use crate::models::{InterestFromUsageRequest, InterestFromUsageResponse};

/// Full replacement topic list after the latest usage
///
/// POST /api/interests/from-usage
///
/// The service is stateless: the client sends its current topics and stores
/// whatever comes back.
pub async fn summarize_interests_from_usage(
    State(app_state): State<AppState>,
    payload: Result<Json<InterestFromUsageRequest>, JsonRejection>,
) -> ApiResult<Json<InterestFromUsageResponse>> {
    let request = json_body(payload)?;
    validate_word_and_context(&request.word, &request.context)?;

    tracing::info!(
        "Summarizing interests from usage: word='{}', url={:?}, page_type={:?}",
        request.word,
        request.url,
        request.page_type
    );

    let topics = app_state
        .stages
        .summarize_interests_from_usage(&request)
        .await
        .map_err(|e| ApiError::from_generation(INTERESTS_LABELS, e))?;

    Ok(Json(InterestFromUsageResponse { topics }))
}
