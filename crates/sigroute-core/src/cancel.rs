//! Per-request cancellation.
//!
//! The transport owns one [`CancelSignal`] per request and hands a clone to
//! the dispatcher. Cancelling drops whichever provider call is in flight and
//! guarantees no handler runs afterwards.

use std::sync::Arc;

use tokio::sync::watch;

/// A cooperative cancellation signal.
///
/// Cloning is cheap and every clone observes the same state.
///
/// # Example
///
/// ```rust
/// use sigroute_core::CancelSignal;
///
/// let signal = CancelSignal::new();
/// let clone = signal.clone();
///
/// signal.cancel();
/// assert!(clone.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancelSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    /// Creates a signal that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Cancels the request. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Completes when the request is cancelled.
    ///
    /// Completes immediately if it already was.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        receiver.wait_for(|cancelled| *cancelled).await.ok();
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_idempotent() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());
        signal.cancel();
        signal.cancel();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_completes_if_already_cancelled() {
        let signal = CancelSignal::new();
        signal.cancel();
        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .expect("should complete immediately");
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let signal = CancelSignal::new();
        let waiter = signal.clone();

        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .expect("task should not panic");
    }

    #[tokio::test]
    async fn test_cancelled_pending_without_cancel() {
        let signal = CancelSignal::new();
        let result = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(result.is_err());
    }
}
