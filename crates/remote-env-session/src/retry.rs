//! Bounded retries with exponential backoff.

use std::{future::Future, time::Duration};

use remote_env_core::{RpcError, config::RetryConfig};
use thiserror::Error;

/// Outcome of a call that did not succeed.
#[derive(Debug, Error)]
pub enum RetryError {
    /// The server rejected the request itself; retrying cannot help.
    #[error("Fatal RPC error: {0}")]
    Fatal(RpcError),
    /// Every attempt failed with a retryable error.
    #[error("Connection problems: {rpc} failed after {attempts} attempts")]
    Exhausted { rpc: String, attempts: u32 },
}

/// Executes one RPC with bounded retries.
///
/// Invalid-argument and failed-precondition errors are returned on the first
/// attempt. Any other error is logged and retried after a delay that starts
/// at `initial_delay` and doubles up to `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryExecutor {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryExecutor {
    /// Create an executor from retry settings.
    ///
    /// A `max_attempts` of zero still makes one attempt.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        let max_attempts = if config.max_attempts == 0 {
            1
        } else {
            config.max_attempts
        };
        Self {
            max_attempts,
            initial_delay: config.initial_delay(),
            max_delay: config.max_delay(),
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `call` until it succeeds, fails fatally or attempts run out.
    ///
    /// # Errors
    /// Returns `RetryError::Fatal` for non-retryable failures and
    /// `RetryError::Exhausted` once all attempts have failed.
    pub async fn execute<T, F, Fut>(&self, rpc: &str, mut call: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let mut delay = self.initial_delay;

        for attempt in 1..=self.max_attempts {
            match call().await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_fatal() => return Err(RetryError::Fatal(e)),
                Err(e) => {
                    tracing::warn!(rpc, attempt, error = %e, "Exception during request");
                    // No point in waiting after the final attempt.
                    if attempt < self.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay = delay.saturating_mul(2).min(self.max_delay);
                    }
                }
            }
        }

        Err(RetryError::Exhausted {
            rpc: rpc.to_string(),
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use remote_env_core::StatusCode;
    use tokio::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    /// Sum of the first `sleeps` backoff delays with the default settings.
    fn expected_backoff(sleeps: u32) -> Duration {
        let mut delay = Duration::from_secs(1);
        let mut total = Duration::ZERO;
        for _ in 0..sleeps {
            total += delay;
            delay = (delay * 2).min(Duration::from_secs(1000));
        }
        total
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_short_circuits() {
        let executor = RetryExecutor::default();
        let calls = Cell::new(0);
        let start = Instant::now();

        let result = executor
            .execute("Step", || {
                calls.set(calls.get() + 1);
                async { Ok::<_, RpcError>("ok") }
            })
            .await;

        assert_eq!(assert_ok!(result), "ok");
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_then_success() {
        for failures in [1_u32, 3, 12, 19] {
            let executor = RetryExecutor::default();
            let calls = Cell::new(0_u32);
            let start = Instant::now();

            let result = executor
                .execute("Step", || {
                    calls.set(calls.get() + 1);
                    let attempt = calls.get();
                    async move {
                        if attempt <= failures {
                            Err(RpcError::unavailable("worker restarting"))
                        } else {
                            Ok(attempt)
                        }
                    }
                })
                .await;

            assert_eq!(assert_ok!(result), failures + 1);
            assert_eq!(start.elapsed(), expected_backoff(failures));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_capped() {
        let executor = RetryExecutor::default();
        let calls = Cell::new(0_u32);
        let start = Instant::now();

        let result = executor
            .execute("Step", || {
                calls.set(calls.get() + 1);
                let attempt = calls.get();
                async move {
                    if attempt <= 13 {
                        Err(RpcError::status(StatusCode::DeadlineExceeded, "slow worker"))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_ok!(result);
        assert_eq!(
            start.elapsed(),
            Duration::from_secs(1 + 2 + 4 + 8 + 16 + 32 + 64 + 128 + 256 + 512 + 1000 * 3)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_propagates_immediately() {
        for code in [StatusCode::InvalidArgument, StatusCode::FailedPrecondition] {
            let executor = RetryExecutor::default();
            let calls = Cell::new(0);
            let start = Instant::now();

            let result = executor
                .execute("Step", || {
                    calls.set(calls.get() + 1);
                    async move { Err::<(), _>(RpcError::status(code, "rejected")) }
                })
                .await;

            let err = assert_err!(result);
            assert!(matches!(err, RetryError::Fatal(e) if e.code() == Some(code)));
            assert_eq!(calls.get(), 1);
            assert_eq!(start.elapsed(), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_max_attempts() {
        let executor = RetryExecutor::default();
        let calls = Cell::new(0);

        let result = executor
            .execute("GetEnvResult", || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(RpcError::ChannelClosed) }
            })
            .await;

        let err = assert_err!(result);
        assert!(matches!(
            err,
            RetryError::Exhausted { ref rpc, attempts: 20 } if rpc == "GetEnvResult"
        ));
        assert_eq!(calls.get(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy() {
        let executor = RetryExecutor::new(RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 10,
            max_delay_ms: 15,
        });
        let calls = Cell::new(0);
        let start = Instant::now();

        let result = executor
            .execute("Step", || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(RpcError::internal("boom")) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        assert_eq!(calls.get(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(10 + 15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_calls_once() {
        let executor = RetryExecutor::new(RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        });
        assert_eq!(executor.max_attempts(), 1);
        let calls = Cell::new(0);

        let result = executor
            .execute("Step", || {
                calls.set(calls.get() + 1);
                async { Ok::<_, RpcError>(7) }
            })
            .await;

        assert_eq!(assert_ok!(result), 7);
        assert_eq!(calls.get(), 1);
    }
}
