// crates/resilience/src/error.rs
//! Error types for resilience operations

use std::time::Duration;
use thiserror::Error;

/// Boxed error type used to carry an underlying operation's failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Errors that can occur in resilience operations
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// All retry attempts exhausted; carries the final underlying error
    #[error("all {attempts} attempts failed: {source}")]
    RetryExhausted { attempts: u32, source: BoxError },

    /// Call rejected without invocation because the circuit is open
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    /// No concurrency slot became available within the configured wait
    #[error("bulkhead full, no slot freed within {waited:?}")]
    BulkheadFull { waited: Duration },

    /// Call rejected because no rate-limit token was available
    #[error("rate limit exceeded ({limit} calls per {period:?})")]
    RateLimitExceeded { limit: u32, period: Duration },

    /// Operation exceeded its time budget
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// A blocking wait was aborted by caller cancellation
    #[error("operation was cancelled")]
    Cancelled,

    /// The invoked operation itself failed; the payload is passed through
    /// unchanged and can be recovered with [`BoxError::downcast_ref`]
    #[error(transparent)]
    Operation(BoxError),
}

impl ResilienceError {
    /// Returns the underlying operation error, if this is a passthrough.
    pub fn operation_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Operation(source) => Some(source.as_ref()),
            _ => None,
        }
    }

    /// True for the rejection variants that never invoked the operation.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::CircuitOpen { .. }
                | Self::BulkheadFull { .. }
                | Self::RateLimitExceeded { .. }
        )
    }
}
