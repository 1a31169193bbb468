use crate::error::PaymentError;
use crate::gateway::PaymentOutcome;
use crate::model::AttemptStatus;

/// Number of failing attempts after which a transaction is given up on.
///
/// Counts total attempts, not retries: `3` means the original delivery plus
/// two redeliveries. Overridable through `MAX_ATTEMPTS`.
pub const MAX_ATTEMPTS: u32 = 3;

/// Ledger `response` text for an approved attempt.
pub const APPROVED_RESPONSE: &str = "Transaction approved";
/// Ledger `response` text for a denied attempt.
pub const DENIED_RESPONSE: &str = "Payment simulation failed";

// ── Decision ───────────────────────────────────────────────────────────────────

/// Outcome of the retry state machine for one delivery.
///
/// `Received → {Approved, RetryableFailure, ExhaustedFailure}`; every variant
/// is terminal for the delivery that produced it. A redelivery of the same
/// transaction starts again from `Received` with a fresh ledger count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The charge went through. Never counts towards exhaustion.
    Approved,

    /// The charge failed but the ceiling has not been reached yet.
    RetryableFailure {
        /// 1-based number of the attempt that just failed.
        attempt: u32,
    },

    /// The charge failed on the last permitted attempt.
    ExhaustedFailure {
        attempt: u32,
    },
}

impl RetryDecision {
    pub fn status(&self) -> AttemptStatus {
        match self {
            Self::Approved => AttemptStatus::Approved,
            Self::RetryableFailure { .. } | Self::ExhaustedFailure { .. } => AttemptStatus::Denied,
        }
    }

    pub fn response(&self) -> &'static str {
        match self {
            Self::Approved => APPROVED_RESPONSE,
            Self::RetryableFailure { .. } | Self::ExhaustedFailure { .. } => DENIED_RESPONSE,
        }
    }

    /// The backend is told about approvals and final rejections only.
    pub fn should_notify(&self) -> bool {
        !matches!(self, Self::RetryableFailure { .. })
    }

    /// Express the decision as the delivery-level result the acknowledger
    /// consumes: failures become typed sentinels so "keep retrying" and
    /// "stop, exhausted" stay distinguishable.
    pub fn into_result(self) -> Result<(), PaymentError> {
        match self {
            Self::Approved => Ok(()),
            Self::RetryableFailure { attempt } => Err(PaymentError::Declined { attempt }),
            Self::ExhaustedFailure { attempt } => {
                Err(PaymentError::MaxAttemptsReached { attempts: attempt })
            }
        }
    }
}

// ── Policy ─────────────────────────────────────────────────────────────────────

/// Retry policy for payment attempts.
///
/// `Copy` so it can be handed to every worker without cloning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts permitted, including the first one.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    /// Returns a policy using the project-wide [`MAX_ATTEMPTS`] constant.
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a custom ceiling. A ceiling of 0 behaves like 1.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Combine the ledger count with the gateway outcome.
    ///
    /// `attempts_so_far` is the number of records already in the ledger for
    /// the transaction; the attempt being decided is `attempts_so_far + 1`.
    pub fn decide(&self, attempts_so_far: u32, outcome: PaymentOutcome) -> RetryDecision {
        let attempt = attempts_so_far.saturating_add(1);
        match outcome {
            PaymentOutcome::Approved => RetryDecision::Approved,
            PaymentOutcome::Failed if attempt >= self.max_attempts => {
                RetryDecision::ExhaustedFailure { attempt }
            }
            PaymentOutcome::Failed => RetryDecision::RetryableFailure { attempt },
        }
    }

    /// Failing attempts still allowed after `attempts_so_far`.
    #[inline]
    pub fn attempts_remaining(&self, attempts_so_far: u32) -> u32 {
        self.max_attempts.saturating_sub(attempts_so_far)
    }
}
