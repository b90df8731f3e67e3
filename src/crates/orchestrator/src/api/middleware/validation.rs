//! Request validation utilities
//!
//! Body extraction failures and blank required fields surface as 422s in the
//! common error format rather than axum's plain-text rejections.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::api::error::{ApiError, ApiResult};

/// Validate that a required string field is not blank
pub fn validate_not_empty(value: &str, field_name: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::ValidationError(format!("{} cannot be empty", field_name)));
    }
    Ok(())
}

/// Validate the `word` and `context` pair every analysis endpoint requires
pub fn validate_word_and_context(word: &str, context: &str) -> ApiResult<()> {
    validate_not_empty(word, "word")?;
    validate_not_empty(context, "context")
}

/// Unwrap a JSON body, mapping rejections to API errors
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::JsonDataError(e)) => Err(ApiError::ValidationError(e.body_text())),
        Err(e) => Err(ApiError::JsonError(e.body_text())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_empty_valid() {
        assert!(validate_not_empty("hello", "word").is_ok());
    }

    #[test]
    fn test_validate_not_empty_blank() {
        let err = validate_not_empty("   ", "word").unwrap_err();
        assert_eq!(err.to_string(), "word cannot be empty");
    }

    #[test]
    fn test_validate_word_and_context() {
        assert!(validate_word_and_context("tactic", "A tactic.").is_ok());
        let err = validate_word_and_context("tactic", "").unwrap_err();
        assert_eq!(err.to_string(), "context cannot be empty");
    }
}
