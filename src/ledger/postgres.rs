use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::model::AttemptRecord;

use super::{AttemptLedger, LedgerError};

// ── Connection retry ───────────────────────────────────────────────────────────

const MAX_CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(2);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

// ── Schema ─────────────────────────────────────────────────────────────────────

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS payment_log (
        id             BIGSERIAL PRIMARY KEY,
        transaction_id TEXT        NOT NULL,
        status         TEXT        NOT NULL,
        response       TEXT        NOT NULL,
        created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS payment_log_transaction_id_idx ON payment_log (transaction_id)";

// ── PgLedger ───────────────────────────────────────────────────────────────────

/// Postgres-backed attempt ledger over the `payment_log` table.
///
/// Cloning is cheap: [`PgPool`] is reference counted.
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Wrap an existing pool. The schema is assumed to exist.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool, verify connectivity, and make sure the schema exists.
    ///
    /// Retries up to [`MAX_CONNECT_ATTEMPTS`] times, [`CONNECT_RETRY_INTERVAL`]
    /// apart, so the worker can start before the database is accepting
    /// connections.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let mut last_error = String::new();

        for attempt in 1..=MAX_CONNECT_ATTEMPTS {
            let result = PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(ACQUIRE_TIMEOUT)
                .connect(database_url)
                .await;

            match result {
                Ok(pool) => {
                    tracing::info!("🗄️  Postgres connected");
                    let ledger = Self::new(pool);
                    ledger.ensure_schema().await?;
                    return Ok(ledger);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < MAX_CONNECT_ATTEMPTS {
                        tracing::warn!(
                            attempt,
                            max = MAX_CONNECT_ATTEMPTS,
                            error = %e,
                            "⚠️  Postgres not ready, retrying in {}s...",
                            CONNECT_RETRY_INTERVAL.as_secs()
                        );
                        tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
                    }
                }
            }
        }

        Err(LedgerError::Connection(format!(
            "failed after {MAX_CONNECT_ATTEMPTS} attempts: {last_error}"
        )))
    }

    /// Create `payment_log` and its lookup index if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), LedgerError> {
        for statement in [CREATE_TABLE, CREATE_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| LedgerError::Schema(e.to_string()))?;
        }
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl AttemptLedger for PgLedger {
    async fn count_attempts(&self, transaction_id: &str) -> Result<u32, LedgerError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payment_log WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LedgerError::Read(e.to_string()))?;

        u32::try_from(count)
            .map_err(|_| LedgerError::Read(format!("attempt count out of range: {count}")))
    }

    async fn append_attempt(&self, record: &AttemptRecord) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO payment_log (transaction_id, status, response, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.transaction_id)
        .bind(record.status.as_str())
        .bind(&record.response)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Write(e.to_string()))?;

        Ok(())
    }
}
