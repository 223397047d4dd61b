//! Cancellation and deadlines for watch sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Handle for cancelling every context derived from it.
#[derive(Debug, Clone)]
pub struct Canceller {
    tx: Arc<watch::Sender<bool>>,
}

impl Canceller {
    /// Create a new canceller.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Derive a context that observes this canceller.
    pub fn context(&self) -> WatchContext {
        WatchContext {
            cancel_rx: self.tx.subscribe(),
            deadline: None,
        }
    }

    /// Cancel every derived context. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether `cancel` was called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Canceller {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation signal and optional deadline carried by a watch.
#[derive(Debug, Clone)]
pub struct WatchContext {
    cancel_rx: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl WatchContext {
    /// Create a context together with the handle that cancels it.
    pub fn new() -> (Self, Canceller) {
        let canceller = Canceller::new();
        (canceller.context(), canceller)
    }

    /// A context nobody can cancel. Only a deadline ends it.
    pub fn background() -> Self {
        Canceller::new().context()
    }

    /// End the context after `timeout`, keeping any earlier deadline.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// End the context at `deadline`, keeping any earlier deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    /// Get the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the context was cancelled or its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolve once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context without a deadline.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_rx.clone();
        let signalled = async move {
            let orphaned = rx.wait_for(|cancelled| *cancelled).await.is_err();
            if orphaned {
                std::future::pending::<()>().await;
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = signalled => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => signalled.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_reaches_context() {
        let (ctx, canceller) = WatchContext::new();
        assert!(!ctx.is_cancelled());

        canceller.cancel();

        assert!(ctx.is_cancelled());
        assert!(canceller.is_cancelled());
        ctx.cancelled().await;
    }

    #[tokio::test]
    async fn test_cancel_after_handle_dropped_still_observed() {
        let (ctx, canceller) = WatchContext::new();
        canceller.cancel();
        drop(canceller);

        assert!(ctx.is_cancelled());
        ctx.cancelled().await;
    }

    #[tokio::test]
    async fn test_timeout_cancels() {
        let ctx = WatchContext::background().with_timeout(Duration::from_millis(10));
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_background_never_cancelled() {
        let ctx = WatchContext::background();
        let waited = tokio::time::timeout(Duration::from_millis(20), ctx.cancelled()).await;
        assert!(waited.is_err());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = WatchContext::background()
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(5)));
    }
}
