use std::sync::Arc;

use tokio::sync::watch;

/// Cooperative cancellation signal shared by every task of a pipeline.
///
/// Cloning is cheap; all clones observe the same flag. Once cancelled a
/// token stays cancelled. Suspension points (`submit`, `next_output`,
/// reads and writes inside the serial stages) race their work against
/// [`cancelled`](Self::cancelled) and return a cancellation error instead
/// of hanging.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
