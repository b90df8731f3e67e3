//! API error types and HTTP response conversion
//!
//! Every failure leaves the service as `{"error", "detail", "code"}` with a
//! matching status. Generation failures are mapped per endpoint so the
//! caller sees a stable message for throttling and outages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use llm::LlmError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::PronunciationError;

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub detail: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, detail: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: detail.into(),
            code: code.into(),
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// How a generation-backed endpoint names itself in error messages.
#[derive(Debug, Clone, Copy)]
pub struct GenerationLabels {
    /// "Image generation" in "... is being rate limited"
    pub operation: &'static str,
    /// "Image generation" in "... service is temporarily unavailable"
    pub service: &'static str,
    /// "generating image" in "Unexpected error while ..."
    pub action: &'static str,
}

pub const MISTAKES_LABELS: GenerationLabels = GenerationLabels {
    operation: "Common mistakes generation",
    service: "Common mistakes",
    action: "generating common mistakes",
};

pub const LEXICAL_MAP_LABELS: GenerationLabels = GenerationLabels {
    operation: "Lexical map text generation",
    service: "Lexical map text",
    action: "generating lexical map text",
};

pub const IMAGE_LABELS: GenerationLabels = GenerationLabels {
    operation: "Image generation",
    service: "Image generation",
    action: "generating image",
};

pub const INTERESTS_LABELS: GenerationLabels = GenerationLabels {
    operation: "Interest summarization",
    service: "Interest summarization",
    action: "summarizing interests",
};

/// Custom API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// Invalid request data
    #[error("{0}")]
    BadRequest(String),

    /// Validation error
    #[error("{0}")]
    ValidationError(String),

    /// Upstream throttling
    #[error("{0}")]
    RateLimited(String),

    /// Upstream unreachable
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Upstream too slow
    #[error("{0}")]
    GatewayTimeout(String),

    /// Upstream answered with its own failure status
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    /// Internal server error
    #[error("{0}")]
    InternalError(String),

    /// JSON parsing error
    #[error("{0}")]
    JsonError(String),
}

impl ApiError {
    /// Map a generation failure for the endpoint described by `labels`.
    pub fn from_generation(labels: GenerationLabels, err: LlmError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match err {
            LlmError::RateLimited { message, .. } => {
                tracing::warn!(error = %message, "{} rate limited", labels.operation);
                ApiError::RateLimited(format!(
                    "{} is being rate limited. Please try again later.",
                    labels.operation
                ))
            }
            LlmError::Connection(message) => {
                tracing::error!(error = %message, "{} connection error", labels.operation);
                ApiError::ServiceUnavailable(format!(
                    "{} service is temporarily unavailable.",
                    labels.service
                ))
            }
            LlmError::Upstream { message, .. }
            | LlmError::MalformedResponse(message)
            | LlmError::EmptyResult(message) => {
                tracing::error!(status = %status, error = %message, "{} failed", labels.operation);
                ApiError::Upstream { status, message }
            }
            other => {
                tracing::error!(error = ?other, "Unexpected error while {}", labels.action);
                ApiError::InternalError(format!("Unexpected error while {}.", labels.action))
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream { status, .. } => *status,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::JsonError(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code identifier
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::RateLimited(_) => "RATE_LIMITED",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::GatewayTimeout(_) => "GATEWAY_TIMEOUT",
            ApiError::Upstream { .. } => "UPSTREAM_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::JsonError(_) => "JSON_ERROR",
        }
    }

    /// Get the error type name
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::RateLimited(_) => "RateLimited",
            ApiError::ServiceUnavailable(_) => "ServiceUnavailable",
            ApiError::GatewayTimeout(_) => "GatewayTimeout",
            ApiError::Upstream { .. } => "UpstreamError",
            ApiError::InternalError(_) => "InternalError",
            ApiError::JsonError(_) => "JsonError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());

        if status.is_server_error() {
            tracing::error!("API Error: {:?}", body);
        } else {
            tracing::warn!("API Error: {:?}", body);
        }

        (status, Json(body)).into_response()
    }
}

impl From<PronunciationError> for ApiError {
    fn from(err: PronunciationError) -> Self {
        match err {
            PronunciationError::NotFound(detail) => ApiError::NotFound(detail),
            PronunciationError::Timeout => {
                ApiError::GatewayTimeout("Pronunciation API timeout".to_string())
            }
            PronunciationError::Unavailable(cause) => {
                tracing::error!(error = %cause, "Pronunciation transport failure");
                ApiError::ServiceUnavailable("Pronunciation service unavailable".to_string())
            }
            PronunciationError::InvalidResponse(cause) => {
                tracing::error!(error = %cause, "Error getting pronunciation");
                ApiError::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonError(err.to_string())
    }
}
