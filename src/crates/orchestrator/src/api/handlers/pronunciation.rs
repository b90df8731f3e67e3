//! Pronunciation endpoint handler

use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::{error::ApiResult, middleware::validate_not_empty, routes::AppState};
use crate::models::PronunciationResponse;

/// IPA and audio for a single word
///
/// GET /api/pronunciation/:word
pub async fn get_pronunciation(
    State(app_state): State<AppState>,
    Path(word): Path<String>,
) -> ApiResult<Json<PronunciationResponse>> {
    validate_not_empty(&word, "word")?;
    let pronunciation = app_state.pronunciation.lookup(&word).await?;
    Ok(Json(pronunciation))
}
