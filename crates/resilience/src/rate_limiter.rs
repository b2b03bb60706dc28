// crates/resilience/src/rate_limiter.rs
//! Token bucket rate limiting
//!
//! Tokens accumulate continuously at `calls / period` up to a cap of
//! `calls`. Each admitted call consumes one token. Refill and consumption
//! happen in a single critical section so concurrent callers never spend
//! the same token twice.

use crate::error::{BoxError, ResilienceError, ResilienceResult};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Rate limiter configuration
///
/// `calls` below 1 is raised to 1 and a zero `period` to one millisecond
/// by [`RateLimiter::new`].
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Calls admitted per period
    pub calls: u32,
    /// Length of the admission window
    pub period: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls: 100,
            period: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    bucket: Arc<Mutex<Bucket>>,
}

impl RateLimiter {
    /// Creates a new rate limiter with a full bucket
    pub fn new(config: RateLimitConfig) -> Self {
        let config = RateLimitConfig {
            calls: config.calls.max(1),
            period: config.period.max(Duration::from_millis(1)),
        };
        let bucket = Bucket {
            tokens: config.calls as f64,
            last_refill: Instant::now(),
        };
        Self {
            config,
            bucket: Arc::new(Mutex::new(bucket)),
        }
    }

    /// Returns the configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Non-blocking check-and-consume: refills by elapsed time, then takes
    /// one token if available.
    pub fn allow(&self) -> bool {
        let mut bucket = self.lock();

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill);
        let rate = self.config.calls as f64 / self.config.period.as_secs_f64();
        bucket.tokens =
            (bucket.tokens + elapsed.as_secs_f64() * rate).min(self.config.calls as f64);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Runs `op` if a token is available, otherwise returns
    /// [`ResilienceError::RateLimitExceeded`] without invoking it.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        if !self.allow() {
            log::debug!(
                "rate limiter rejected caller ({} calls per {:?})",
                self.config.calls,
                self.config.period
            );
            return Err(ResilienceError::RateLimitExceeded {
                limit: self.config.calls,
                period: self.config.period,
            });
        }

        match op().await {
            Ok(value) => Ok(value),
            Err(e) => Err(ResilienceError::Operation(e.into())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Bucket> {
        // Every critical section leaves the bucket consistent, so a
        // poisoned lock is recoverable.
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
