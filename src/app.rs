use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::{Config, ConfigError};
use crate::gateway::SimulatedGateway;
use crate::ledger::{LedgerError, PgLedger};
use crate::messaging::{build_pool, ConsumerError, RabbitConsumer, RabbitError};
use crate::metrics::Metrics;
use crate::notifier::{BackendClient, NotificationDispatcher, NotifyError, TokenIssuer};
use crate::processor::PaymentProcessor;
use crate::retry::RetryPolicy;
use crate::shutdown::{self, ShutdownHandle};
use crate::worker::WorkerPool;

// ── Error type ─────────────────────────────────────────────────────────────────

/// Top-level application error, surfaced only at startup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("rabbitmq pool error: {0}")]
    RabbitMQ(#[from] RabbitError),
    #[error("consumer error: {0}")]
    Consumer(#[from] ConsumerError),
    #[error("notifier error: {0}")]
    Notifier(#[from] NotifyError),
    #[error("signal handler error: {0}")]
    Signal(#[from] std::io::Error),
    #[error("worker pool error: {0}")]
    Pool(String),
    #[error("delivery stream closed before shutdown was requested")]
    StreamClosed,
}

// ── Entry point ────────────────────────────────────────────────────────────────

/// Full application lifecycle.
///
/// # Startup sequence
/// 1. Load and validate configuration.
/// 2. Connect to Postgres and ensure the `payment_log` schema.
/// 3. Build the RabbitMQ connection pool.
/// 4. Spawn the notification task.
/// 5. Wire ledger + gateway + notifier into the processor, consumer into the pool.
/// 6. Run until SIGINT / SIGTERM, then drain workers and pending notifications.
///    If the delivery stream closes first, drain the same way and fail.
pub async fn run() -> Result<(), AppError> {
    // ── 1. Configuration ──────────────────────────────────────────────────────
    let cfg = Config::load()?;
    cfg.log_summary();

    let metrics = Arc::new(Metrics::new());
    let (shutdown_handle, shutdown_signal) = shutdown::new_pair();

    // ── 2. Attempt ledger ─────────────────────────────────────────────────────
    tracing::info!("🗄️  connecting to Postgres...");
    let ledger = PgLedger::connect(&cfg.database_url, cfg.db_max_connections).await?;

    // ── 3. RabbitMQ pool ──────────────────────────────────────────────────────
    // Only the consumer holds a channel; one spare connection for reconnects.
    tracing::info!("🔌 connecting to RabbitMQ...");
    let rabbit_pool = build_pool(&cfg.rabbitmq_url, 2).await?;

    // ── 4. Notifier ───────────────────────────────────────────────────────────
    let tokens = TokenIssuer::new(&cfg.jwt_secret, cfg.jwt_issuer.clone(), cfg.jwt_audience.clone());
    let backend = BackendClient::new(&cfg.backend_url, tokens, cfg.notify_timeout())?;
    tracing::info!(endpoint = backend.endpoint(), "📨 notifier ready");
    let (notifier, notifier_task) =
        NotificationDispatcher::spawn(backend, cfg.notify_queue_capacity, Arc::clone(&metrics));

    // ── 5. Processor, consumer, pool ──────────────────────────────────────────
    let processor = Arc::new(PaymentProcessor::new(
        Arc::new(ledger.clone()),
        Arc::new(SimulatedGateway::new(cfg.approval_probability)),
        Arc::new(notifier),
        RetryPolicy::new(cfg.max_attempts),
    ));

    // `Config` caps WORKERS_COUNT at u16::MAX.
    let prefetch = u16::try_from(cfg.workers_count).unwrap_or(u16::MAX);
    let consumer = RabbitConsumer::new(&rabbit_pool, prefetch, Arc::clone(&metrics)).await?;
    let jobs_rx = consumer.into_receiver().await?;

    let pool = WorkerPool::new(processor, cfg.workers_count, Arc::clone(&metrics));

    tracing::info!(
        workers = cfg.workers_count,
        "✅ payment worker ready, waiting for payment attempts"
    );

    // ── 6. Run until signalled or the delivery stream dies ────────────────────
    let pool_task = tokio::spawn(pool.run(jobs_rx, shutdown_signal));

    let outcome = supervise(pool_task, shutdown_handle, shutdown::wait_for_os_signal()).await;

    // The pool owned the last dispatcher handle; the task now drains and exits.
    if let Err(e) = notifier_task.await {
        tracing::error!(error = %e, "notification task panicked during shutdown");
    }

    ledger.close().await;
    rabbit_pool.close();

    metrics.log_summary();
    outcome?;
    tracing::info!("✅ shutdown complete");
    Ok(())
}

/// Wait for an OS signal or for the worker pool to stop on its own.
///
/// A signal triggers graceful shutdown and joins the pool. A pool that ends
/// first means the broker stream closed underneath it; that is reported as
/// [`AppError::StreamClosed`] so the process exits non-zero and can be
/// restarted by its supervisor.
async fn supervise<S>(
    mut pool_task: JoinHandle<()>,
    shutdown_handle: ShutdownHandle,
    os_signal: S,
) -> Result<(), AppError>
where
    S: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        signal = os_signal => {
            tracing::info!("🛑 initiating graceful shutdown...");
            shutdown_handle.trigger();
            pool_task.await.map_err(|e| AppError::Pool(e.to_string()))?;
            signal.map_err(AppError::from)
        }
        joined = &mut pool_task => {
            tracing::error!("💥 delivery stream closed, no payments are being consumed");
            joined.map_err(|e| AppError::Pool(e.to_string()))?;
            Err(AppError::StreamClosed)
        }
    }
}
