//! Lexical map endpoint handlers
//!
//! Related-word text for lazy loading, plus cached illustrations contrasting
//! a word with one of its related words.

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::api::{
    error::{ApiError, ApiResult, IMAGE_LABELS, LEXICAL_MAP_LABELS},
    middleware::{json_body, validate_word_and_context},
    routes::AppState,
};
use crate::cache::TtlCache;
use crate::models::{Layer4Response, LexicalImageRequest, LexicalImageResponse, LexicalMapRequest};

/// Related words and personalized coaching, as JSON
///
/// POST /api/lexical-map/text
pub async fn generate_lexical_map_text(
    State(app_state): State<AppState>,
    payload: Result<Json<LexicalMapRequest>, JsonRejection>,
) -> ApiResult<Json<Layer4Response>> {
    let request = json_body(payload)?;
    validate_word_and_context(&request.word, &request.context)?;

    tracing::info!(
        "Generating lexical map text for word='{}' (context length={}, level={:?})",
        request.word,
        request.context.len(),
        request.english_level
    );

    let result = app_state
        .stages
        .generate_layer4(&request)
        .await
        .map_err(|e| ApiError::from_generation(LEXICAL_MAP_LABELS, e))?;

    Ok(Json(result))
}

/// Illustration for a (base word, related word) pair
///
/// POST /api/lexical-map/image
pub async fn generate_lexical_image(
    State(app_state): State<AppState>,
    payload: Result<Json<LexicalImageRequest>, JsonRejection>,
) -> ApiResult<Json<LexicalImageResponse>> {
    let request = json_body(payload)?;
    let base_word = request.base_word.trim();
    let related_word = request.related_word.trim();

    if base_word.is_empty() || related_word.is_empty() {
        return Err(ApiError::BadRequest(
            "Both base_word and related_word are required.".to_string(),
        ));
    }

    let cache_key = (base_word.to_lowercase(), related_word.to_lowercase());
    if let Some(cached) = app_state.image_cache.get_fresh(&cache_key) {
        tracing::debug!("Lexical image cache hit for {:?}", cache_key);
        return Ok(Json(cached));
    }

    let image = app_state
        .stages
        .generate_lexical_image(base_word, related_word)
        .await
        .map_err(|e| ApiError::from_generation(IMAGE_LABELS, e))?;

    app_state.image_cache.put(cache_key, image.clone());
    Ok(Json(image))
}
