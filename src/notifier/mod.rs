//! Best-effort callback to the backend on terminal payment outcomes.
//!
//! Handlers never wait on the backend: [`Notifier::notify`] only enqueues onto
//! a bounded channel, and a single background task performs the signed HTTP
//! calls. Failures are logged and counted, never propagated.

mod backend;
mod token;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::metrics::Metrics;
use crate::model::AttemptStatus;

pub use backend::{BackendClient, NotifyError};
pub use token::{InternalClaims, TokenError, TokenIssuer, ADMIN_ROLE, TOKEN_TTL_SECS};

/// Body of `PUT {BACKEND_URL}/transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub transaction_id: i64,
    pub status: AttemptStatus,
    pub message: String,
}

impl Notification {
    pub fn new(transaction_id: i64, status: AttemptStatus, message: impl Into<String>) -> Self {
        Self {
            transaction_id,
            status,
            message: message.into(),
        }
    }
}

/// Fire-and-forget side channel. Implementations must not block the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

// ── Dispatcher ─────────────────────────────────────────────────────────────────

/// Enqueuing half of the notification pipeline.
///
/// When the queue is full the notification is discarded with a warning:
/// delivery is at-most-once and must never apply backpressure to workers.
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Notification>,
    metrics: Arc<Metrics>,
}

impl NotificationDispatcher {
    /// Build the dispatcher and the receiver its delivery task drains.
    pub fn channel(
        capacity: usize,
        metrics: Arc<Metrics>,
    ) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, metrics }, rx)
    }

    /// Build the dispatcher and spawn its delivery task.
    ///
    /// The task exits once every dispatcher handle is dropped and the queue
    /// is drained; await the returned handle to flush on shutdown.
    pub fn spawn(
        client: BackendClient,
        capacity: usize,
        metrics: Arc<Metrics>,
    ) -> (Self, JoinHandle<()>) {
        let (dispatcher, rx) = Self::channel(capacity, Arc::clone(&metrics));
        let handle = tokio::spawn(deliver_loop(rx, client, metrics));
        (dispatcher, handle)
    }
}

impl Notifier for NotificationDispatcher {
    fn notify(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => {
                self.metrics.inc_notifications_discarded();
                tracing::warn!(
                    transaction_id = n.transaction_id,
                    status = %n.status,
                    "📭 notification queue full, discarding"
                );
            }
            Err(TrySendError::Closed(n)) => {
                self.metrics.inc_notifications_discarded();
                tracing::warn!(
                    transaction_id = n.transaction_id,
                    status = %n.status,
                    "📭 notification task stopped, discarding"
                );
            }
        }
    }
}

/// Drain the queue, one signed HTTP call per notification.
pub async fn deliver_loop(
    mut rx: mpsc::Receiver<Notification>,
    client: BackendClient,
    metrics: Arc<Metrics>,
) {
    while let Some(notification) = rx.recv().await {
        match client.send(&notification).await {
            Ok(status) => {
                metrics.inc_notifications_sent();
                tracing::info!(
                    transaction_id = notification.transaction_id,
                    status = %notification.status,
                    http_status = status.as_u16(),
                    "📨 backend notified"
                );
            }
            Err(e) => {
                metrics.inc_notifications_failed();
                tracing::error!(
                    transaction_id = notification.transaction_id,
                    status = %notification.status,
                    error = %e,
                    "❌ backend notification failed"
                );
            }
        }
    }

    tracing::debug!("notification task stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn notification_body_matches_backend_contract() {
        let n = Notification::new(42, AttemptStatus::Denied, "Payment simulation failed");
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "transaction_id": 42,
                "status": "DENIED",
                "message": "Payment simulation failed"
            })
        );
    }

    #[tokio::test]
    async fn full_queue_discards_instead_of_blocking() {
        let metrics = Arc::new(Metrics::new());
        let (dispatcher, mut rx) = NotificationDispatcher::channel(1, Arc::clone(&metrics));

        dispatcher.notify(Notification::new(1, AttemptStatus::Approved, "a"));
        dispatcher.notify(Notification::new(2, AttemptStatus::Approved, "b"));

        assert_eq!(metrics.snapshot().notifications_discarded, 1);
        assert_eq!(rx.recv().await.unwrap().transaction_id, 1);
    }

    #[tokio::test]
    async fn closed_queue_discards() {
        let metrics = Arc::new(Metrics::new());
        let (dispatcher, rx) = NotificationDispatcher::channel(4, Arc::clone(&metrics));
        drop(rx);

        dispatcher.notify(Notification::new(1, AttemptStatus::Denied, "x"));
        assert_eq!(metrics.snapshot().notifications_discarded, 1);
    }

    #[tokio::test]
    async fn delivery_failures_are_counted_not_propagated() {
        let metrics = Arc::new(Metrics::new());
        let tokens = TokenIssuer::new("secret", "payment-ms", "backend");
        let client =
            BackendClient::new("http://127.0.0.1:9", tokens, Duration::from_millis(500)).unwrap();

        let (dispatcher, handle) = NotificationDispatcher::spawn(client, 8, Arc::clone(&metrics));
        dispatcher.notify(Notification::new(7, AttemptStatus::Approved, "Transaction approved"));
        drop(dispatcher);

        handle.await.unwrap();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.notifications_failed, 1);
        assert_eq!(snapshot.notifications_sent, 0);
    }
}
