use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::messaging::Job;
use crate::metrics::Metrics;
use crate::processor::PaymentProcessor;
use crate::shutdown::ShutdownSignal;

use super::task;

/// Concurrent worker pool.
///
/// ```text
/// jobs_rx (mpsc from RabbitConsumer)
///     │
///     │  dispatch loop — backpressure point
///     ▼
/// internal_channel  (bounded, capacity = workers × 2)
///     │
///     │  Arc<Mutex<Receiver>>  — shared among N worker tasks
///     ▼
/// Worker-0 ──► task::process ──► ledger / gateway / ack
/// ...
/// Worker-N ──► task::process ──► ledger / gateway / ack
/// ```
///
/// # Backpressure
/// When every worker is busy and the internal channel is full, the dispatch
/// loop stops reading `jobs_rx`. With `prefetch_count = workers_count` the
/// broker then holds back new deliveries until a worker resolves one.
///
/// # Shutdown
/// On the shutdown signal (or when `jobs_rx` closes) the dispatch loop exits
/// and drops the internal sender; workers finish their current delivery, see
/// `None`, and stop. `run()` returns once every worker has been joined.
pub struct WorkerPool {
    processor: Arc<PaymentProcessor>,
    workers_count: usize,
    metrics: Arc<Metrics>,
}

impl WorkerPool {
    pub fn new(processor: Arc<PaymentProcessor>, workers_count: usize, metrics: Arc<Metrics>) -> Self {
        Self {
            processor,
            workers_count: workers_count.max(1),
            metrics,
        }
    }

    /// Start processing and block until shutdown or until `jobs_rx` closes.
    pub async fn run(self, mut jobs_rx: mpsc::Receiver<Job>, mut shutdown_signal: ShutdownSignal) {
        let (internal_tx, internal_rx) = mpsc::channel::<Job>(self.workers_count * 2);

        // tokio Mutex: the guard is held across `recv().await`.
        let shared_rx: Arc<Mutex<mpsc::Receiver<Job>>> = Arc::new(Mutex::new(internal_rx));

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(self.workers_count);

        for worker_id in 0..self.workers_count {
            let rx = Arc::clone(&shared_rx);
            let processor = Arc::clone(&self.processor);
            let metrics = Arc::clone(&self.metrics);

            let handle = tokio::spawn(async move {
                tracing::debug!(worker = worker_id, "worker started");

                loop {
                    // Lock only for the receive, not for the processing.
                    let job = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };

                    match job {
                        None => {
                            tracing::debug!(worker = worker_id, "worker stopping");
                            break;
                        }
                        Some(job) => task::process(worker_id, job, &processor, &metrics).await,
                    }
                }
            });

            handles.push(handle);
        }

        tracing::info!(workers = self.workers_count, "👷 {} workers ready", self.workers_count);

        // ── Dispatch loop ─────────────────────────────────────────────────────
        // `biased` keeps a busy stream from starving the shutdown branch.
        loop {
            tokio::select! {
                biased;

                _ = shutdown_signal.wait() => {
                    tracing::info!("🛑 shutdown signal received, draining in-flight payments...");
                    break;
                }

                job = jobs_rx.recv() => {
                    match job {
                        None => break,
                        Some(job) => {
                            if internal_tx.send(job).await.is_err() {
                                tracing::error!("internal job channel closed unexpectedly");
                                break;
                            }
                        }
                    }
                }
            }
        }

        drop(internal_tx);

        tracing::info!("🛑 waiting for {} workers...", handles.len());

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "worker task panicked during shutdown");
            }
        }

        tracing::info!("all workers stopped");
    }
}
