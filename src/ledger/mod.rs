//! Attempt ledger: the durable, append-only log of processing attempts.
//!
//! The number of records stored for a transaction ID is the only retry state
//! the worker trusts, so the policy stays correct across restarts and
//! redeliveries.

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::model::AttemptRecord;

pub use memory::InMemoryLedger;
pub use postgres::PgLedger;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger connection failed: {0}")]
    Connection(String),
    #[error("ledger schema setup failed: {0}")]
    Schema(String),
    #[error("counting attempts failed: {0}")]
    Read(String),
    #[error("appending attempt failed: {0}")]
    Write(String),
}

/// Storage seam for attempt history. No update or delete exists.
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    /// Attempts recorded so far for `transaction_id` (0 if none).
    async fn count_attempts(&self, transaction_id: &str) -> Result<u32, LedgerError>;

    /// Durably append one attempt record.
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<(), LedgerError>;
}
