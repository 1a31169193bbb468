#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use payment_worker::gateway::SimulatedGateway;
use payment_worker::ledger::InMemoryLedger;
use payment_worker::messaging::Disposition;
use payment_worker::model::Transaction;
use payment_worker::notifier::{Notification, Notifier};
use payment_worker::processor::PaymentProcessor;
use payment_worker::retry::RetryPolicy;

/// Notifier double that records instead of calling the backend.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

pub struct Harness {
    pub processor: PaymentProcessor,
    pub ledger: Arc<InMemoryLedger>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Processor over an in-memory ledger. `approval_probability` of 0.0 or 1.0
/// forces every charge to fail or succeed.
pub fn harness(approval_probability: f64) -> Harness {
    let ledger = Arc::new(InMemoryLedger::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let processor = PaymentProcessor::new(
        ledger.clone(),
        Arc::new(SimulatedGateway::new(approval_probability)),
        notifier.clone(),
        RetryPolicy::default(),
    );
    Harness {
        processor,
        ledger,
        notifier,
    }
}

pub fn payload(id: i64, amount: &str) -> Vec<u8> {
    format!(
        r#"{{"ID": {id}, "Amount": {amount}, "Card": {{"Number": "4111111111111111", "HolderName": "Test Holder", "CVV": "123", "ExpiryDate": "12/30"}}}}"#
    )
    .into_bytes()
}

/// Same path a delivery takes through the consume loop and a worker, minus
/// the broker: decode, handle, pick a disposition.
pub async fn deliver(processor: &PaymentProcessor, body: &[u8]) -> Disposition {
    let result = match Transaction::decode(body) {
        Ok(transaction) => processor.handle(&transaction).await,
        Err(e) => Err(e.into()),
    };
    Disposition::for_result(&result)
}
