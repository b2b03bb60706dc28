// crates/resilience/src/bulkhead.rs
//! Bulkhead pattern: bounded concurrent execution
//!
//! Limits the number of in-flight invocations of the wrapped operation.
//! Callers beyond the limit wait up to `max_wait` for a slot, then are
//! rejected. Slots are semaphore permits held as RAII guards, so a slot is
//! released on every exit path.

use crate::cancel::CancelToken;
use crate::error::{BoxError, ResilienceError, ResilienceResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Bulkhead configuration
///
/// `max_concurrent` below 1 is raised to 1 by [`BulkheadExecutor::new`].
#[derive(Debug, Clone)]
pub struct BulkheadConfig {
    /// Maximum number of concurrent in-flight operations
    pub max_concurrent: usize,
    /// How long a caller waits for a free slot before rejection
    pub max_wait: Duration,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            max_wait: Duration::from_secs(1),
        }
    }
}

/// Bounds concurrent invocations of the wrapped operation
#[derive(Debug, Clone)]
pub struct BulkheadExecutor {
    config: BulkheadConfig,
    semaphore: Arc<Semaphore>,
}

impl BulkheadExecutor {
    /// Creates a new bulkhead with `max_concurrent` free slots
    pub fn new(config: BulkheadConfig) -> Self {
        let config = BulkheadConfig {
            max_concurrent: config.max_concurrent.max(1),
            ..config
        };
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        Self { config, semaphore }
    }

    /// Returns the configuration
    pub fn config(&self) -> &BulkheadConfig {
        &self.config
    }

    /// Number of currently free slots
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Runs `op` inside a concurrency slot.
    ///
    /// Returns [`ResilienceError::BulkheadFull`] without invoking `op`
    /// when no slot frees up within `max_wait`.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.run(op, None).await
    }

    /// Like [`execute`](Self::execute), but aborts the slot wait with
    /// [`ResilienceError::Cancelled`] if `cancel` fires first.
    pub async fn execute_cancellable<F, Fut, T, E>(
        &self,
        op: F,
        cancel: &CancelToken,
    ) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.run(op, Some(cancel)).await
    }

    async fn run<F, Fut, T, E>(
        &self,
        op: F,
        cancel: Option<&CancelToken>,
    ) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        let acquired = match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Err(ResilienceError::Cancelled),
                    acquired = timeout(self.config.max_wait, self.semaphore.acquire()) => acquired,
                }
            }
            None => timeout(self.config.max_wait, self.semaphore.acquire()).await,
        };

        // The semaphore is never closed, so acquire itself cannot fail;
        // only the wait deadline can.
        let _permit = match acquired {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) | Err(_) => {
                log::debug!(
                    "bulkhead rejected caller after waiting {:?}",
                    self.config.max_wait
                );
                return Err(ResilienceError::BulkheadFull {
                    waited: self.config.max_wait,
                });
            }
        };

        match op().await {
            Ok(value) => Ok(value),
            Err(e) => Err(ResilienceError::Operation(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn bulkhead(max_concurrent: usize, max_wait: Duration) -> BulkheadExecutor {
        BulkheadExecutor::new(BulkheadConfig {
            max_concurrent,
            max_wait,
        })
    }

    #[tokio::test]
    async fn test_executes_within_capacity() {
        let bh = bulkhead(2, Duration::from_millis(100));

        let result = bh.execute(|| async { Ok::<_, &str>(42) }).await;
        assert_eq!(result.ok(), Some(42));
        assert_eq!(bh.available_slots(), 2);
    }

    #[tokio::test]
    async fn test_rejects_when_full() {
        let bh = Arc::new(bulkhead(1, Duration::from_millis(20)));

        let holder = bh.clone();
        let handle = tokio::spawn(async move {
            holder
                .execute(|| async {
                    sleep(Duration::from_millis(200)).await;
                    Ok::<_, &str>(())
                })
                .await
        });

        // Wait until the holder occupies the only slot.
        sleep(Duration::from_millis(50)).await;
        assert_eq!(bh.available_slots(), 0);

        let calls = AtomicUsize::new(0);
        let result = bh
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>(())
            })
            .await;

        assert!(matches!(
            result,
            Err(ResilienceError::BulkheadFull { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(handle.await.expect("holder task").is_ok());
    }

    #[tokio::test]
    async fn test_slot_released_on_operation_error() {
        let bh = bulkhead(1, Duration::from_millis(100));

        let result = bh.execute(|| async { Err::<(), _>("boom") }).await;
        assert!(matches!(result, Err(ResilienceError::Operation(_))));
        assert_eq!(bh.available_slots(), 1);

        let result = bh.execute(|| async { Ok::<_, &str>(()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_peak_concurrency_never_exceeds_limit() {
        let bh = Arc::new(bulkhead(3, Duration::from_secs(5)));
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let bh = bh.clone();
            let current = current.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                bh.execute(move || async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(10)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, &str>(())
                })
                .await
            }));
        }

        for handle in handles {
            assert!(handle.await.expect("caller task").is_ok());
        }
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_cancellation_during_slot_wait() {
        let bh = Arc::new(bulkhead(1, Duration::from_secs(5)));

        let holder = bh.clone();
        tokio::spawn(async move {
            holder
                .execute(|| async {
                    sleep(Duration::from_millis(500)).await;
                    Ok::<_, &str>(())
                })
                .await
        });
        sleep(Duration::from_millis(50)).await;

        let token = CancelToken::new();
        let signaller = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            signaller.cancel();
        });

        let calls = AtomicUsize::new(0);
        let result = bh
            .execute_cancellable(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, &str>(())
                },
                &token,
            )
            .await;

        assert!(matches!(result, Err(ResilienceError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_capacity_normalized_to_one() {
        let bh = BulkheadExecutor::new(BulkheadConfig {
            max_concurrent: 0,
            max_wait: Duration::from_secs(1),
        });
        assert_eq!(bh.config().max_concurrent, 1);
        assert_eq!(bh.available_slots(), 1);
    }
}
