use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::AttemptRecord;

use super::{AttemptLedger, LedgerError};

/// Process-local ledger.
///
/// Keeps the same append-only contract as [`super::PgLedger`]. Reads and
/// writes can be switched to fail, which lets callers exercise the
/// storage-error paths without a database.
#[derive(Default)]
pub struct InMemoryLedger {
    records: Mutex<Vec<AttemptRecord>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `count_attempts` call fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `append_attempt` call fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Records for one transaction, oldest first.
    pub fn records_for(&self, transaction_id: &str) -> Vec<AttemptRecord> {
        self.lock()
            .iter()
            .filter(|r| r.transaction_id == transaction_id)
            .cloned()
            .collect()
    }

    /// Total number of records across all transactions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AttemptRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AttemptLedger for InMemoryLedger {
    async fn count_attempts(&self, transaction_id: &str) -> Result<u32, LedgerError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Read("in-memory ledger read disabled".into()));
        }
        let count = self
            .lock()
            .iter()
            .filter(|r| r.transaction_id == transaction_id)
            .count();
        Ok(count as u32)
    }

    async fn append_attempt(&self, record: &AttemptRecord) -> Result<(), LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Write("in-memory ledger write disabled".into()));
        }
        self.lock().push(record.clone());
        Ok(())
    }
}
