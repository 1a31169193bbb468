use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Application-wide runtime metrics.
///
/// All counters use `Relaxed` ordering; they are independent observations.
/// Share via `Arc<Metrics>`.
pub struct Metrics {
    /// Deliveries consumed from RabbitMQ, malformed ones included.
    pub deliveries_received: AtomicU64,

    /// Deliveries whose decision was `Approved`.
    pub payments_approved: AtomicU64,

    /// Deliveries rejected with requeue after a retryable failure.
    /// A single transaction contributes once per failed attempt.
    pub payments_retried: AtomicU64,

    /// Deliveries that reached the attempt ceiling and were given up on.
    pub payments_exhausted: AtomicU64,

    /// Malformed deliveries dropped without requeue.
    pub deliveries_dropped: AtomicU64,

    /// Deliveries requeued because the ledger failed.
    pub storage_failures: AtomicU64,

    /// Deliveries currently being handled (gauge).
    pub in_flight: AtomicI64,

    pub notifications_sent: AtomicU64,
    pub notifications_failed: AtomicU64,
    /// Notifications dropped because the queue was full or closed.
    pub notifications_discarded: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            deliveries_received: AtomicU64::new(0),
            payments_approved: AtomicU64::new(0),
            payments_retried: AtomicU64::new(0),
            payments_exhausted: AtomicU64::new(0),
            deliveries_dropped: AtomicU64::new(0),
            storage_failures: AtomicU64::new(0),
            in_flight: AtomicI64::new(0),
            notifications_sent: AtomicU64::new(0),
            notifications_failed: AtomicU64::new(0),
            notifications_discarded: AtomicU64::new(0),
        }
    }

    // ── Convenience increment methods ─────────────────────────────────────────

    pub fn inc_received(&self) {
        self.deliveries_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_approved(&self) {
        self.payments_approved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_retried(&self) {
        self.payments_retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_exhausted(&self) {
        self.payments_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped(&self) {
        self.deliveries_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_storage_failures(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_in_flight(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_in_flight(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn inc_notifications_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_notifications_failed(&self) {
        self.notifications_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_notifications_discarded(&self) {
        self.notifications_discarded.fetch_add(1, Ordering::Relaxed);
    }

    // ── Snapshot ──────────────────────────────────────────────────────────────

    /// Point-in-time copy of all counters. Approximate under concurrent
    /// updates, which is fine for logging.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.deliveries_received.load(Ordering::Relaxed),
            approved: self.payments_approved.load(Ordering::Relaxed),
            retried: self.payments_retried.load(Ordering::Relaxed),
            exhausted: self.payments_exhausted.load(Ordering::Relaxed),
            dropped: self.deliveries_dropped.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            notifications_discarded: self.notifications_discarded.load(Ordering::Relaxed),
        }
    }

    /// Log a summary of all metrics via `tracing`.
    pub fn log_summary(&self) {
        let s = self.snapshot();
        tracing::info!(
            received         = s.received,
            approved         = s.approved,
            retried          = s.retried,
            exhausted        = s.exhausted,
            dropped          = s.dropped,
            storage_failures = s.storage_failures,
            in_flight        = s.in_flight,
            notified         = s.notifications_sent,
            notify_failed    = s.notifications_failed,
            notify_discarded = s.notifications_discarded,
            "📊 metrics summary"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of [`Metrics`] counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub approved: u64,
    pub retried: u64,
    pub exhausted: u64,
    pub dropped: u64,
    pub storage_failures: u64,
    pub in_flight: i64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub notifications_discarded: u64,
}
