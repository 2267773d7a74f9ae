//! Bounded submission retry with fixed inter-attempt delay
//!
//! Submission failures are assumed transient (the local server may still be
//! starting, or the machine briefly offline), so every error is retried up
//! to the configured bound. The delay between attempts is fixed, with no
//! exponential backoff and no jitter. Polling is deliberately NOT routed
//! through this module; a failed poll terminates its sequence immediately.
//!
//! # Example
//!
//! ```no_run
//! use track_dl::retry::submit_with_retry;
//! use track_dl::config::SubmitRetryConfig;
//! use track_dl::error::SubmitError;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SubmitRetryConfig::default();
//! let ack = submit_with_retry(&config, || async {
//!     // Your submission here
//!     Ok::<_, SubmitError>("accepted")
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::SubmitRetryConfig;
use crate::error::RetryError;
use std::future::Future;

/// Execute an async submission with bounded fixed-delay retry
///
/// # Arguments
///
/// * `config` - Retry configuration (`max_retries` retries after the initial
///   attempt, fixed `retry_delay` between attempts)
/// * `operation` - Async closure returning `Result<T, E>`
///
/// # Returns
///
/// The first successful result, or [`RetryError::MaxRetriesExceeded`]
/// carrying the final attempt's error once `max_retries + 1` attempts have
/// failed. The operation is never called again after a success.
pub async fn submit_with_retry<F, Fut, T, E>(
    config: &SubmitRetryConfig,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    let max_attempts = config.max_retries + 1;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "submission succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = config.retry_delay.as_millis(),
                    "submission failed, retrying"
                );
                tokio::time::sleep(config.retry_delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    attempts = attempt,
                    "submission failed after all retry attempts exhausted"
                );
                return Err(RetryError::MaxRetriesExceeded {
                    attempts: attempt,
                    last: e,
                });
            }
        }
    }
}
