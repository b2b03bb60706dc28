// crates/resilience/src/lib.rs
//! Resilience patterns for fault-tolerant operations
//!
//! This crate provides composable guards that wrap a possibly-failing,
//! possibly-slow operation:
//! - Retry with exponential backoff and jitter
//! - Circuit breaker
//! - Bulkhead (bounded concurrency)
//! - Rate limiting (token bucket)
//! - Timeout handling
//!
//! Executors compose by nesting: one executor's wrapped call becomes
//! another executor's operation. All state is in-process and scoped to the
//! executor instance; every executor is safe under concurrent invocation.
//!
//! # Example
//!
//! ```rust
//! use breakwater_resilience::{
//!     CircuitBreaker, CircuitBreakerConfig, RetryConfig, RetryExecutor,
//! };
//! use std::time::Duration;
//!
//! // Retry with exponential backoff
//! let retry = RetryExecutor::new(RetryConfig {
//!     max_attempts: 5,
//!     base_delay: Duration::from_millis(100),
//!     ..RetryConfig::default()
//! });
//!
//! // Circuit breaker, one per downstream dependency
//! let breaker = CircuitBreaker::new("catalog-api", CircuitBreakerConfig::default());
//! ```

mod bulkhead;
mod cancel;
mod circuit_breaker;
mod error;
mod rate_limiter;
mod retry;
mod timeout;

pub use bulkhead::{BulkheadConfig, BulkheadExecutor};
pub use cancel::CancelToken;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use error::{BoxError, ResilienceError, ResilienceResult};
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use retry::{RetryConfig, RetryExecutor};
pub use timeout::{with_timeout, Timeout};
