//! Retry logic for outbound generation calls
//!
//! Exponential backoff with jitter, driven by a classifier that maps each
//! error to a [`RetryDecision`]. Only the generation client wraps its calls
//! with this; orchestration logic is never retried.

use crate::error::LlmError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the server-provided delay
    RetryAfter(Duration),

    /// Retry after the next exponential backoff delay
    Backoff,

    /// Give up and surface the error
    Fail,
}

/// Retry strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u64,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Whether to add random jitter to backoff delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 1000,
            max_backoff_ms: 60_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Build from a total attempt budget, as configured by operators
    pub fn from_attempts(max_attempts: u32) -> Self {
        Self::new(max_attempts.saturating_sub(1))
    }

    /// Set initial backoff delay
    pub fn with_initial_backoff(mut self, ms: u64) -> Self {
        self.initial_backoff_ms = ms;
        self
    }

    /// Set maximum backoff delay
    pub fn with_max_backoff(mut self, ms: u64) -> Self {
        self.max_backoff_ms = ms;
        self
    }

    /// Set backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate backoff delay for a given attempt
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powi(attempt as i32)) as u64;

        let delay_ms = delay_ms.min(self.max_backoff_ms);

        let delay_ms = if self.jitter {
            // Up to 25% extra
            let jitter_amount = (delay_ms as f64 * 0.25 * rand::random::<f64>()) as u64;
            delay_ms + jitter_amount
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms)
    }

    /// Delay to wait before attempt `attempt + 1`
    fn delay_for(&self, decision: RetryDecision, attempt: u32) -> Duration {
        match decision {
            RetryDecision::RetryAfter(delay) => {
                delay.min(Duration::from_millis(self.max_backoff_ms))
            }
            _ => self.backoff_delay(attempt),
        }
    }
}

/// Default classifier for generation errors
///
/// Honours a server-provided delay; otherwise anything
/// [`LlmError::is_retryable`] accepts backs off exponentially.
pub fn classify(error: &LlmError) -> RetryDecision {
    match error {
        LlmError::RateLimited {
            retry_after: Some(delay),
            ..
        } => RetryDecision::RetryAfter(*delay),
        e if e.is_retryable() => RetryDecision::Backoff,
        _ => RetryDecision::Fail,
    }
}

/// Execute an async operation with retry logic
///
/// # Arguments
/// * `config` - Retry configuration
/// * `operation_name` - Name of the operation for logging
/// * `classifier` - Decides whether and how long to wait after each failure
/// * `f` - Async operation to execute; called once per attempt
pub async fn retry_with_backoff<F, Fut, T, C>(
    config: &RetryConfig,
    operation_name: &str,
    classifier: C,
    mut f: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
    C: Fn(&LlmError) -> RetryDecision,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            info!(
                operation = operation_name,
                attempt = attempt,
                max_retries = config.max_retries,
                "Retrying operation"
            );
        }

        let error = match f().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        let decision = classifier(&error);

        debug!(
            operation = operation_name,
            attempt = attempt,
            error = %error,
            decision = ?decision,
            "Operation failed"
        );

        if decision == RetryDecision::Fail {
            error!(
                operation = operation_name,
                error = %error,
                "Non-retryable error, aborting retries"
            );
            return Err(error);
        }

        if attempt >= config.max_retries {
            error!(
                operation = operation_name,
                max_retries = config.max_retries,
                error = %error,
                "All retry attempts exhausted"
            );
            return Err(error);
        }

        let delay = config.delay_for(decision, attempt);

        warn!(
            operation = operation_name,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transient error, will retry after delay"
        );

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.initial_backoff_ms, 1000);
        assert_eq!(config.max_backoff_ms, 60_000);
        assert_eq!(config.backoff_multiplier, 2.0);
        assert!(config.jitter);
    }

    #[test]
    fn test_from_attempts() {
        assert_eq!(RetryConfig::from_attempts(3).max_retries, 2);
        assert_eq!(RetryConfig::from_attempts(0).max_retries, 0);
    }

    #[test]
    fn test_backoff_delay_exponential() {
        let config = RetryConfig::new(3)
            .with_initial_backoff(1000)
            .with_jitter(false);

        assert_eq!(config.backoff_delay(0).as_millis(), 1000);
        assert_eq!(config.backoff_delay(1).as_millis(), 2000);
        assert_eq!(config.backoff_delay(2).as_millis(), 4000);
    }

    #[test]
    fn test_backoff_delay_max_cap() {
        let config = RetryConfig::new(10)
            .with_initial_backoff(1000)
            .with_max_backoff(5000)
            .with_jitter(false);

        assert_eq!(config.backoff_delay(5).as_millis(), 5000);
    }

    #[test]
    fn test_retry_after_is_capped() {
        let config = RetryConfig::new(1).with_max_backoff(2000);
        let delay = config.delay_for(RetryDecision::RetryAfter(Duration::from_secs(60)), 0);
        assert_eq!(delay, Duration::from_millis(2000));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&LlmError::rate_limited("x", Some(Duration::from_secs(3)))),
            RetryDecision::RetryAfter(Duration::from_secs(3))
        );
        assert_eq!(classify(&LlmError::Connection("x".into())), RetryDecision::Backoff);
        assert_eq!(
            classify(&LlmError::Upstream {
                status: 400,
                message: "x".into()
            }),
            RetryDecision::Backoff
        );
        assert_eq!(
            classify(&LlmError::Upstream {
                status: 401,
                message: "x".into()
            }),
            RetryDecision::Fail
        );
        assert_eq!(classify(&LlmError::malformed("x")), RetryDecision::Fail);
    }

    #[test]
    fn test_classify_agrees_with_is_retryable() {
        let errors = [
            LlmError::rate_limited("x", None),
            LlmError::Connection("x".into()),
            LlmError::Upstream { status: 403, message: "x".into() },
            LlmError::Upstream { status: 502, message: "x".into() },
            LlmError::EmptyResult("x".into()),
            LlmError::Config("x".into()),
        ];
        for error in errors {
            let expected = if error.is_retryable() {
                RetryDecision::Backoff
            } else {
                RetryDecision::Fail
            };
            assert_eq!(classify(&error), expected, "{error:?}");
        }
        assert_eq!(classify(&LlmError::rate_limited("x", None)), RetryDecision::Backoff);
        assert_eq!(classify(&LlmError::EmptyResult("x".into())), RetryDecision::Fail);
    }

    #[tokio::test]
    async fn test_retry_success_after_transient_errors() {
        let config = RetryConfig::new(3).with_initial_backoff(5).with_jitter(false);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = retry_with_backoff(&config, "test_operation", classify, move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(LlmError::Connection("reset".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_malformed_is_never_retried() {
        let config = RetryConfig::new(3).with_initial_backoff(5);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<(), _> = retry_with_backoff(&config, "test_operation", classify, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::malformed("not json"))
            }
        })
        .await;

        assert!(matches!(result, Err(LlmError::MalformedResponse(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exhausts_budget() {
        let config = RetryConfig::new(2).with_initial_backoff(5).with_jitter(false);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<(), _> = retry_with_backoff(&config, "test_operation", classify, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::rate_limited("busy", Some(Duration::from_millis(5))))
            }
        })
        .await;

        assert!(matches!(result, Err(LlmError::RateLimited { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
