//! Cooperative cancellation for open streams.
//!
//! The server owns one handle; every SSE stream holds a clone and checks it
//! before producing each frame. Cancelling the handle ends all streams.

use tokio::sync::watch;

/// A cloneable cancellation signal backed by a `tokio::sync::watch` channel.
#[derive(Clone, Debug)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl CancellationHandle {
    /// Create a new (not-yet-cancelled) handle.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until cancellation is requested. Returns immediately if it already was.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // wait_for checks the current value first
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Cancel this handle when the returned guard is dropped.
    pub fn drop_guard(self) -> CancelOnDrop {
        CancelOnDrop { handle: self }
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancels its handle on drop.
#[derive(Debug)]
pub struct CancelOnDrop {
    handle: CancellationHandle,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}
