use crate::ledger::LedgerError;
use crate::model::DecodeError;

/// Everything that can end the handling of one delivery other than an
/// approval.
///
/// `Declined` and `MaxAttemptsReached` are expected business outcomes rather
/// than faults; they are errors so the acknowledger can tell "keep retrying"
/// apart from "stop, exhausted" with a single match.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("storage error: {0}")]
    Storage(#[from] LedgerError),

    #[error("simulated payment failure on attempt {attempt}")]
    Declined { attempt: u32 },

    #[error("maximum payment attempts reached after {attempts} attempts")]
    MaxAttemptsReached { attempts: u32 },
}
