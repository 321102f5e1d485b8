//! Cooperative cancellation signal shared between a run and its controller.

use std::sync::Arc;
use tokio::sync::watch;

/// A write-once, idempotent cancellation signal.
///
/// Clones observe the same signal. Cancelling an already-cancelled token is a
/// no-op, and the flag never resets. The runner polls [`is_cancelled`] between
/// script lines and awaits [`cancelled`] with a timeout inside wait slices,
/// so cancellation latency stays bounded without busy-waiting.
///
/// [`is_cancelled`]: CancelToken::is_cancelled
/// [`cancelled`]: CancelToken::cancelled
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the token is cancelled. Returns immediately if it already is.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so wait_for can only fail after every
        // token clone is dropped, which cannot happen while we hold one.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
