// crates/resilience/src/retry.rs
//! Retry with exponential backoff and jitter

use crate::cancel::CancelToken;
use crate::error::{BoxError, ResilienceError, ResilienceResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry configuration
///
/// Out-of-range values are normalized by [`RetryExecutor::new`]:
/// `max_attempts` is raised to 1, `backoff_multiplier` to 1.0, and `jitter`
/// is clamped into `[0, 1]`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of invocations, including the first attempt
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier applied to the delay for each subsequent retry
    pub backoff_multiplier: f64,
    /// Upper bound on the un-jittered delay
    pub max_delay: Duration,
    /// Fraction of the delay used as the uniform jitter range
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: 0.1,
        }
    }
}

/// Re-invokes a failing operation with backoff between attempts
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Creates a new retry executor, normalizing the configuration
    pub fn new(config: RetryConfig) -> Self {
        let config = RetryConfig {
            max_attempts: config.max_attempts.max(1),
            backoff_multiplier: config.backoff_multiplier.max(1.0),
            jitter: config.jitter.clamp(0.0, 1.0),
            ..config
        };
        Self { config }
    }

    /// Returns the normalized configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Invokes `op` until it succeeds or `max_attempts` is reached.
    ///
    /// The final failure is returned as
    /// [`ResilienceError::RetryExhausted`] carrying the underlying error.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> ResilienceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.run(op, None).await
    }

    /// Like [`execute`](Self::execute), but aborts with
    /// [`ResilienceError::Cancelled`] if `cancel` fires during a backoff
    /// sleep. The operation is never re-invoked after cancellation.
    pub async fn execute_cancellable<F, Fut, T, E>(
        &self,
        op: F,
        cancel: &CancelToken,
    ) -> ResilienceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.run(op, Some(cancel)).await
    }

    async fn run<F, Fut, T, E>(
        &self,
        mut op: F,
        cancel: Option<&CancelToken>,
    ) -> ResilienceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        let mut attempt = 1;

        loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(ResilienceError::Cancelled);
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= self.config.max_attempts {
                        return Err(ResilienceError::RetryExhausted {
                            attempts: attempt,
                            source: e.into(),
                        });
                    }

                    let delay = self.delay_for_retry(attempt);
                    log::debug!(
                        "attempt {} of {} failed, retrying in {:?}",
                        attempt,
                        self.config.max_attempts,
                        delay
                    );

                    match cancel {
                        Some(token) => {
                            tokio::select! {
                                _ = token.cancelled() => {
                                    return Err(ResilienceError::Cancelled);
                                }
                                _ = sleep(delay) => {}
                            }
                        }
                        None => sleep(delay).await,
                    }

                    attempt += 1;
                }
            }
        }
    }

    /// Delay before retry `n` (1-based): exponential backoff capped at
    /// `max_delay`, then perturbed by a uniform jitter of up to
    /// ±`jitter * delay`.
    fn delay_for_retry(&self, n: u32) -> Duration {
        let base = self.config.base_delay.as_secs_f64()
            * self.config.backoff_multiplier.powi(n.saturating_sub(1) as i32);
        let capped = base.min(self.config.max_delay.as_secs_f64());

        let jitter_range = capped * self.config.jitter;
        let jitter = rand::random::<f64>() * jitter_range * 2.0 - jitter_range;

        Duration::from_secs_f64((capped + jitter).max(0.0))
    }
}
