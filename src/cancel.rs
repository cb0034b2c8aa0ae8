//! Cancellation for in-flight requests.
//!
//! A [`CancellationToken`] lets a caller abandon a logical request between
//! attempts: the retry loop checks it at loop entry and races it against the
//! backoff sleep, so a cancel during a long backoff takes effect immediately
//! instead of after the delay.

use std::sync::Arc;
use tokio::sync::watch;

/// Clonable cancellation signal. All clones observe the same state; once
/// cancelled, a token stays cancelled.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(tx),
        }
    }

    /// Cancels the token, waking anyone waiting in [`Self::cancelled`].
    pub fn cancel(&self) {
        self.inner.send_replace(true);
    }

    /// Returns `true` once [`Self::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.borrow()
    }

    /// Resolves when the token is cancelled. Never resolves otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.inner.subscribe();
        // The sender lives in self, so wait_for can only fail if every
        // clone of the token is dropped while we wait; treat that as
        // never-cancelled and park forever like a pending future would.
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
