// src/error_recovery.rs
//! Retry with exponential backoff for API operations.

use crate::error::AppError;
use std::time::Duration;

/// Backoff schedule for a retried operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// The schedule used for "load more" fetches.
    pub fn load_more() -> Self {
        use crate::constants::{
            LOAD_MORE_INITIAL_DELAY_MS, LOAD_MORE_MAX_ATTEMPTS, LOAD_MORE_MAX_DELAY_MS,
        };
        Self {
            max_attempts: LOAD_MORE_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(LOAD_MORE_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(LOAD_MORE_MAX_DELAY_MS),
        }
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

/// Retries an async operation with exponential backoff.
///
/// Only errors that report themselves as retryable are retried; anything
/// else is returned on the spot.
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    policy: RetryPolicy,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut delay = policy.initial_delay;
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                last_error = Some(e);

                if attempt < policy.max_attempts {
                    log::warn!("Attempt {} failed, retrying after {:?}", attempt, delay);
                    tokio::time::sleep(delay).await;

                    delay = std::cmp::min(delay * 2, policy.max_delay);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::InternalError {
        message: "Retry failed with no error".to_string(),
        source: None,
    }))
}
