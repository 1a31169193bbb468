mod attempt;
mod transaction;

pub use attempt::{AttemptRecord, AttemptStatus};
pub use transaction::{Card, DecodeError, Transaction};
