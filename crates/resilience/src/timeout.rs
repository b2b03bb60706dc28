// crates/resilience/src/timeout.rs
//! Timeout handling utilities

use crate::error::{BoxError, ResilienceError, ResilienceResult};
use std::future::Future;
use std::time::Duration;

/// Races an operation against a time budget
pub async fn with_timeout<F, Fut, T, E>(duration: Duration, op: F) -> ResilienceResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    match tokio::time::timeout(duration, op()).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ResilienceError::Operation(e.into())),
        Err(_) => Err(ResilienceError::Timeout(duration)),
    }
}

/// Timeout wrapper for operations
#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    /// Creates a new timeout
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Gets the timeout duration
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Executes an operation with this timeout
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        with_timeout(self.duration, op).await
    }
}
