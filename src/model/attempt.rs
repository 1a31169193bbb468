use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status column of a `payment_log` row and the `status` field of the
/// backend notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    Approved,
    Denied,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One processing attempt, as written to the attempt ledger.
///
/// Records are append-only: the number of records for a `transaction_id` is
/// the authoritative attempt count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub transaction_id: String,
    pub status: AttemptStatus,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Build a record stamped with the current time.
    pub fn new(transaction_id: String, status: AttemptStatus, response: impl Into<String>) -> Self {
        Self {
            transaction_id,
            status,
            response: response.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_screaming_case() {
        assert_eq!(serde_json::to_string(&AttemptStatus::Approved).unwrap(), r#""APPROVED""#);
        assert_eq!(serde_json::to_string(&AttemptStatus::Denied).unwrap(), r#""DENIED""#);
        assert_eq!(AttemptStatus::Denied.to_string(), "DENIED");
    }
}
