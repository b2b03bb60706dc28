// crates/resilience/src/circuit_breaker.rs
//! Circuit breaker pattern implementation
//!
//! Tracks consecutive failures of a named downstream dependency and
//! short-circuits calls once a threshold is reached. Three states:
//! Closed (normal operation), Open (calls rejected), HalfOpen (a limited
//! number of probe calls test whether the dependency recovered).
//!
//! The Open → HalfOpen transition is lazy: it happens on the first call
//! after `open_timeout` has elapsed, not on a background timer.

use crate::error::{BoxError, ResilienceError, ResilienceResult};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected without invoking the operation
    Open,
    /// A bounded number of probe requests test the dependency
    HalfOpen,
}

/// Circuit breaker configuration
///
/// Thresholds below 1 are raised to 1 by [`CircuitBreaker::new`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in Closed before the circuit opens
    pub failure_threshold: u32,
    /// Successful probes in HalfOpen before the circuit closes
    pub success_threshold: u32,
    /// Time the circuit stays Open before admitting probes
    pub open_timeout: Duration,
    /// Maximum probe calls admitted per HalfOpen episode
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            open_timeout: Duration::from_secs(30),
            half_open_max_calls: 3,
        }
    }
}

/// Mutable breaker record. One mutex guards the whole record so every
/// decision sees a consistent state-and-counter pair.
#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    /// Consecutive failures; meaningful only in Closed
    failures: u32,
    /// Successful probes; meaningful only in HalfOpen
    successes: u32,
    /// Probes admitted in the current HalfOpen episode
    admitted: u32,
    /// Set on every transition into Open
    opened_at: Option<Instant>,
}

/// Circuit breaker for a single named dependency
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Arc<Mutex<BreakerState>>,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker in the Closed state
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let config = CircuitBreakerConfig {
            failure_threshold: config.failure_threshold.max(1),
            success_threshold: config.success_threshold.max(1),
            half_open_max_calls: config.half_open_max_calls.max(1),
            ..config
        };
        Self {
            name: name.into(),
            config,
            state: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                admitted: 0,
                opened_at: None,
            })),
        }
    }

    /// The dependency name this breaker guards
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state. Open is reported until the next call actually
    /// triggers the lazy HalfOpen transition.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Admits or rejects a call, applying the lazy Open → HalfOpen
    /// transition when `open_timeout` has elapsed.
    pub fn try_acquire(&self) -> ResilienceResult<()> {
        let mut s = self.lock();
        match s.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let timed_out = s
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.open_timeout)
                    .unwrap_or(true);
                if timed_out {
                    s.state = CircuitState::HalfOpen;
                    s.successes = 0;
                    s.admitted = 1;
                    log::debug!("circuit breaker '{}' half-open, probing", self.name);
                    Ok(())
                } else {
                    Err(ResilienceError::CircuitOpen {
                        name: self.name.clone(),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if s.admitted < self.config.half_open_max_calls {
                    s.admitted += 1;
                    Ok(())
                } else {
                    Err(ResilienceError::CircuitOpen {
                        name: self.name.clone(),
                    })
                }
            }
        }
    }

    /// Records a successful operation
    pub fn record_success(&self) {
        let mut s = self.lock();
        match s.state {
            CircuitState::Closed => {
                s.failures = 0;
            }
            CircuitState::HalfOpen => {
                s.successes += 1;
                if s.successes >= self.config.success_threshold {
                    s.state = CircuitState::Closed;
                    s.failures = 0;
                    s.successes = 0;
                    s.admitted = 0;
                    s.opened_at = None;
                    log::info!("circuit breaker '{}' closed after recovery", self.name);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failed operation
    pub fn record_failure(&self) {
        let mut s = self.lock();
        match s.state {
            CircuitState::Closed => {
                s.failures += 1;
                if s.failures >= self.config.failure_threshold {
                    s.state = CircuitState::Open;
                    s.opened_at = Some(Instant::now());
                    s.successes = 0;
                    log::warn!(
                        "circuit breaker '{}' opened after {} consecutive failures",
                        self.name,
                        s.failures
                    );
                }
            }
            CircuitState::HalfOpen => {
                s.state = CircuitState::Open;
                s.opened_at = Some(Instant::now());
                s.successes = 0;
                s.admitted = 0;
                log::warn!("circuit breaker '{}' reopened by failed probe", self.name);
            }
            CircuitState::Open => {}
        }
    }

    /// Executes an operation through the circuit breaker.
    ///
    /// Rejected calls return [`ResilienceError::CircuitOpen`] without
    /// invoking `op`. An invoked operation's failure is passed through
    /// unchanged as [`ResilienceError::Operation`]; the breaker gates
    /// invocation, it never masks the underlying error.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.try_acquire()?;

        match op().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(ResilienceError::Operation(e.into()))
            }
        }
    }

    /// Forces the circuit Open, rejecting calls until `open_timeout`
    /// elapses. Administrative escape hatch.
    pub fn force_open(&self) {
        let mut s = self.lock();
        s.state = CircuitState::Open;
        s.opened_at = Some(Instant::now());
        s.failures = 0;
        s.successes = 0;
        s.admitted = 0;
    }

    /// Forces the circuit Closed with fresh counters. Administrative
    /// escape hatch.
    pub fn force_close(&self) {
        let mut s = self.lock();
        s.state = CircuitState::Closed;
        s.failures = 0;
        s.successes = 0;
        s.admitted = 0;
        s.opened_at = None;
    }

    /// Clears the failure and success counters without changing the
    /// current state.
    pub fn reset(&self) {
        let mut s = self.lock();
        s.failures = 0;
        s.successes = 0;
        s.admitted = 0;
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // Every critical section leaves the record consistent, so a
        // poisoned lock is recoverable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
