use std::time::Duration;

use deadpool_lapin::Manager;
use lapin::ConnectionProperties;

/// Re-exported so other modules inside `messaging/` can import Pool from here.
pub type Pool = deadpool_lapin::Pool;

// ── Consumer-side topology ─────────────────────────────────────────────────────

/// Direct exchange the backend publishes payment attempts to.
pub const PAYMENT_EXCHANGE: &str = "payment.events.exchange";
/// Durable queue bound to [`PAYMENT_EXCHANGE`] for incoming attempts.
pub const PAYMENT_QUEUE: &str = "payment_simulation";
/// Routing key of payment simulation requests.
pub const PAYMENT_ROUTING_KEY: &str = "payment.simulation.request";
/// Consumer tag shown in the management UI.
pub const CONSUMER_TAG: &str = "payment-worker";

// ── Connection retry ───────────────────────────────────────────────────────────

const MAX_CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

// ── Error ──────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RabbitError {
    /// Could not establish a connection after all retry attempts.
    #[error("RabbitMQ connection failed: {0}")]
    Connection(String),
    /// Failed to build the connection pool itself.
    #[error("connection pool build failed: {0}")]
    Pool(String),
}

// ── Pool constructor ───────────────────────────────────────────────────────────

/// Build a [`deadpool_lapin`] connection pool and verify connectivity.
///
/// Attempts up to [`MAX_CONNECT_ATTEMPTS`] (5) times with a
/// [`CONNECT_RETRY_INTERVAL`] (5 s) delay between attempts, so the worker can
/// come up before the broker does.
pub async fn build_pool(url: &str, max_connections: usize) -> Result<Pool, RabbitError> {
    let manager = Manager::new(url, ConnectionProperties::default());

    let pool = Pool::builder(manager)
        .max_size(max_connections)
        .build()
        .map_err(|e| RabbitError::Pool(e.to_string()))?;

    let mut last_error = String::new();

    for attempt in 1..=MAX_CONNECT_ATTEMPTS {
        match pool.get().await {
            Ok(_) => {
                tracing::info!("📡 RabbitMQ connected");
                return Ok(pool);
            }
            Err(e) => {
                last_error = e.to_string();
                if attempt < MAX_CONNECT_ATTEMPTS {
                    tracing::warn!(
                        attempt,
                        max = MAX_CONNECT_ATTEMPTS,
                        error = %e,
                        "⚠️  RabbitMQ not ready, retrying in {}s...",
                        CONNECT_RETRY_INTERVAL.as_secs()
                    );
                    tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
                }
            }
        }
    }

    Err(RabbitError::Connection(format!(
        "failed after {MAX_CONNECT_ATTEMPTS} attempts: {last_error}"
    )))
}
