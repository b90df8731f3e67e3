//! Error types for the generation client.

use std::time::Duration;
use thiserror::Error;

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when talking to the generation service.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Upstream signalled throttling.
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        /// Server-provided delay before the next attempt.
        retry_after: Option<Duration>,
    },

    /// Network failure, timeout or upstream 5xx.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Upstream answered with a non-success status unrelated to rate limiting.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Upstream succeeded but the content is unusable (not JSON, wrong shape).
    #[error("{0}")]
    MalformedResponse(String),

    /// A streamed completion produced no content at all.
    #[error("{0}")]
    EmptyResult(String),

    /// Client misconfiguration (missing key, bad URL).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Build a rate-limit error.
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        LlmError::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    /// Build a structural validation error.
    pub fn malformed(message: impl Into<String>) -> Self {
        LlmError::MalformedResponse(message.into())
    }

    /// Check if this error is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Connection(_) => true,
            LlmError::Upstream { status, .. } => !matches!(status, 401 | 403),
            _ => false,
        }
    }

    /// HTTP status that best describes this error to a downstream caller.
    pub fn status_code(&self) -> u16 {
        match self {
            LlmError::RateLimited { .. } => 429,
            LlmError::Connection(_) => 503,
            LlmError::Upstream { status, .. } => *status,
            _ => 500,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Connection("Request timeout".to_string())
        } else if err.is_decode() {
            LlmError::MalformedResponse(format!("Failed to decode response: {}", err))
        } else {
            LlmError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::MalformedResponse(format!("Invalid JSON response: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(LlmError::rate_limited("slow down", None).status_code(), 429);
        assert_eq!(LlmError::Connection("refused".into()).status_code(), 503);
        assert_eq!(
            LlmError::Upstream {
                status: 502,
                message: "boom".into()
            }
            .status_code(),
            502
        );
        assert_eq!(LlmError::malformed("bad").status_code(), 500);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::rate_limited("x", Some(Duration::from_secs(1))).is_retryable());
        assert!(LlmError::Connection("x".into()).is_retryable());
        assert!(!LlmError::malformed("x").is_retryable());
        assert!(!LlmError::EmptyResult("x".into()).is_retryable());
        assert!(!LlmError::Upstream {
            status: 401,
            message: "no key".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_display_keeps_upstream_message() {
        let err = LlmError::Upstream {
            status: 400,
            message: "model not found".into(),
        };
        assert_eq!(err.to_string(), "model not found");
    }
}
