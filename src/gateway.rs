use async_trait::async_trait;
use rand::Rng;

use crate::model::Transaction;

/// Default probability that a simulated charge is approved.
pub const DEFAULT_APPROVAL_PROBABILITY: f64 = 0.7;

/// Raw outcome of one charge attempt, before the retry policy sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved,
    Failed,
}

/// Seam between the retry state machine and whatever decides a charge.
///
/// The simulator below is the only implementation today; a real gateway
/// client would slot in here without touching [`crate::retry`] or
/// [`crate::processor`].
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, transaction: &Transaction) -> PaymentOutcome;
}

/// Bernoulli stand-in for a payment gateway.
///
/// Every call is an independent draw; the transaction content is ignored.
/// A probability of `1.0` always approves and `0.0` always fails, which makes
/// the simulator deterministic for tests.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedGateway {
    approval_probability: f64,
}

impl SimulatedGateway {
    /// `approval_probability` is clamped into `[0.0, 1.0]`.
    pub fn new(approval_probability: f64) -> Self {
        let approval_probability = if approval_probability.is_nan() {
            0.0
        } else {
            approval_probability.clamp(0.0, 1.0)
        };
        Self { approval_probability }
    }

    pub fn approval_probability(&self) -> f64 {
        self.approval_probability
    }

    /// One draw, independent of any transaction.
    pub fn simulate(&self) -> PaymentOutcome {
        if rand::thread_rng().gen_bool(self.approval_probability) {
            PaymentOutcome::Approved
        } else {
            PaymentOutcome::Failed
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(DEFAULT_APPROVAL_PROBABILITY)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(&self, _transaction: &Transaction) -> PaymentOutcome {
        self.simulate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extreme_probabilities_are_deterministic() {
        let always = SimulatedGateway::new(1.0);
        let never = SimulatedGateway::new(0.0);
        for _ in 0..100 {
            assert_eq!(always.simulate(), PaymentOutcome::Approved);
            assert_eq!(never.simulate(), PaymentOutcome::Failed);
        }
    }

    #[test]
    fn out_of_range_probability_is_clamped() {
        assert_eq!(SimulatedGateway::new(7.5).approval_probability(), 1.0);
        assert_eq!(SimulatedGateway::new(-1.0).approval_probability(), 0.0);
        assert_eq!(SimulatedGateway::new(f64::NAN).approval_probability(), 0.0);
    }

    #[test]
    fn default_rate_is_roughly_seventy_percent() {
        let gateway = SimulatedGateway::default();
        let draws = 20_000;
        let approved = (0..draws)
            .filter(|_| gateway.simulate() == PaymentOutcome::Approved)
            .count();
        let rate = approved as f64 / draws as f64;
        // ~10 standard deviations of slack around p = 0.7.
        assert!((0.66..0.74).contains(&rate), "approval rate {rate}");
    }
}
