// crates/resilience/src/cancel.rs
//! Caller-driven cancellation for blocking waits
//!
//! Executors that sleep (retry backoff) or wait on a slot (bulkhead) accept
//! a [`CancelToken`] through their `*_cancellable` entry points. Cancelling
//! the token aborts the wait promptly with
//! [`ResilienceError::Cancelled`](crate::ResilienceError::Cancelled).

use std::sync::Arc;
use tokio::sync::watch;

/// Clonable cancellation signal.
///
/// All clones observe the same flag; cancellation is one-way and permanent
/// for the lifetime of the token.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Creates a new, un-cancelled token.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the token is cancelled; resolves immediately if it
    /// already was.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // wait_for checks the current value before waiting, so a token
        // cancelled before this call resolves without suspending.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_token_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_is_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();

        token.cancel();
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_cancelled_resolves_on_signal() {
        let token = CancelToken::new();
        let signaller = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signaller.cancel();
        });

        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("cancellation should arrive well within the timeout");
    }
}
