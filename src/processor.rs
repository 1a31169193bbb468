use std::sync::Arc;

use crate::error::PaymentError;
use crate::gateway::PaymentGateway;
use crate::ledger::AttemptLedger;
use crate::model::{AttemptRecord, Transaction};
use crate::notifier::{Notification, Notifier};
use crate::retry::{RetryDecision, RetryPolicy};

/// The retry state machine for one delivery.
///
/// ```text
/// count_attempts ─► authorize ─► decide ─► append_attempt ─► notify (terminal only)
/// ```
///
/// Exactly one ledger record is appended per decoded delivery. If the append
/// fails the decision is discarded and the storage error is returned, so the
/// delivery is requeued and no notification goes out for an attempt the
/// ledger never saw.
///
/// Concurrent deliveries of the same transaction ID are not serialized; the
/// count-then-append pair is not atomic.
#[derive(Clone)]
pub struct PaymentProcessor {
    ledger: Arc<dyn AttemptLedger>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    policy: RetryPolicy,
}

impl PaymentProcessor {
    pub fn new(
        ledger: Arc<dyn AttemptLedger>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            ledger,
            gateway,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run one delivery through the state machine and return the decision.
    ///
    /// The only error is [`PaymentError::Storage`]; a failed ledger read stops
    /// before the gateway is consulted.
    pub async fn process(&self, transaction: &Transaction) -> Result<RetryDecision, PaymentError> {
        let key = transaction.ledger_key();

        let attempts_so_far = self.ledger.count_attempts(&key).await?;
        let outcome = self.gateway.authorize(transaction).await;
        let decision = self.policy.decide(attempts_so_far, outcome);

        tracing::debug!(
            transaction_id = transaction.id,
            attempts_so_far,
            ?outcome,
            ?decision,
            "retry decision"
        );

        let record = AttemptRecord::new(key, decision.status(), decision.response());
        self.ledger.append_attempt(&record).await?;

        if decision.should_notify() {
            self.notifier.notify(Notification::new(
                transaction.id,
                decision.status(),
                decision.response(),
            ));
        }

        Ok(decision)
    }

    /// [`Self::process`] folded into the delivery-level result: `Ok` for an
    /// approval, a typed [`PaymentError`] for everything else.
    pub async fn handle(&self, transaction: &Transaction) -> Result<(), PaymentError> {
        self.process(transaction)
            .await
            .and_then(RetryDecision::into_result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::gateway::SimulatedGateway;
    use crate::ledger::InMemoryLedger;
    use crate::model::{AttemptStatus, Card};

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification) {
            self.sent.lock().unwrap().push(notification);
        }
    }

    fn transaction(id: i64) -> Transaction {
        Transaction {
            id,
            amount: dec!(25.00),
            card: Card::default(),
        }
    }

    fn processor(
        approval_probability: f64,
    ) -> (PaymentProcessor, Arc<InMemoryLedger>, Arc<RecordingNotifier>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let processor = PaymentProcessor::new(
            ledger.clone(),
            Arc::new(SimulatedGateway::new(approval_probability)),
            notifier.clone(),
            RetryPolicy::default(),
        );
        (processor, ledger, notifier)
    }

    #[tokio::test]
    async fn approval_appends_and_notifies_once() {
        let (processor, ledger, notifier) = processor(1.0);

        let decision = processor.process(&transaction(7)).await.unwrap();

        assert_eq!(decision, RetryDecision::Approved);
        let records = ledger.records_for("7");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttemptStatus::Approved);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn retryable_failure_does_not_notify() {
        let (processor, ledger, notifier) = processor(0.0);

        let result = processor.handle(&transaction(3)).await;

        assert!(matches!(result, Err(PaymentError::Declined { attempt: 1 })));
        assert_eq!(ledger.records_for("3").len(), 1);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_failure_skips_gateway_and_ledger_write() {
        let (processor, ledger, notifier) = processor(1.0);
        ledger.set_fail_reads(true);

        let result = processor.process(&transaction(11)).await;

        assert!(matches!(result, Err(PaymentError::Storage(_))));
        assert!(ledger.is_empty());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_failure_supersedes_decision() {
        let (processor, ledger, notifier) = processor(1.0);
        ledger.set_fail_writes(true);

        let result = processor.handle(&transaction(12)).await;

        assert!(matches!(result, Err(PaymentError::Storage(_))));
        assert!(notifier.sent.lock().unwrap().is_empty());
    }
}
