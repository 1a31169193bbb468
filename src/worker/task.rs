use crate::error::PaymentError;
use crate::messaging::{Disposition, Job};
use crate::metrics::Metrics;
use crate::model::Transaction;
use crate::processor::PaymentProcessor;
use crate::retry::RetryPolicy;

/// Handle one payment delivery end-to-end and resolve it on the broker.
///
/// # Execution flow
/// 1. Run the transaction through [`PaymentProcessor::handle`].
/// 2. Log and count the outcome with transaction context (ID, amount).
/// 3. Map the result to a [`Disposition`] and ack / nack the delivery.
///
/// | Result               | Disposition  |
/// |----------------------|--------------|
/// | approved             | ack          |
/// | max attempts reached | ack          |
/// | declined             | nack requeue |
/// | storage error        | nack requeue |
pub async fn process(worker_id: usize, job: Job, processor: &PaymentProcessor, metrics: &Metrics) {
    let Job {
        transaction,
        delivery,
    } = job;

    metrics.inc_in_flight();

    let redelivered = if delivery.redelivered { " [redelivery]" } else { "" };
    tracing::info!(
        worker = worker_id,
        transaction_id = transaction.id,
        amount = %transaction.amount,
        "▶️  payment #{}{}",
        transaction.id,
        redelivered
    );

    let result = processor.handle(&transaction).await;
    report(worker_id, &transaction, &result, processor.policy(), metrics);

    Disposition::for_result(&result).apply(&delivery).await;

    metrics.dec_in_flight();
}

/// Log one handling result with transaction context and count it.
fn report(
    worker_id: usize,
    transaction: &Transaction,
    result: &Result<(), PaymentError>,
    policy: RetryPolicy,
    metrics: &Metrics,
) {
    match result {
        Ok(()) => {
            metrics.inc_approved();
            tracing::info!(
                worker = worker_id,
                transaction_id = transaction.id,
                amount = %transaction.amount,
                "✅ #{} approved",
                transaction.id
            );
        }
        Err(PaymentError::Declined { attempt }) => {
            metrics.inc_retried();
            tracing::warn!(
                worker = worker_id,
                transaction_id = transaction.id,
                amount = %transaction.amount,
                remaining = policy.attempts_remaining(*attempt),
                "🔄 #{} declined, attempt {}/{}",
                transaction.id,
                attempt,
                policy.max_attempts
            );
        }
        Err(PaymentError::MaxAttemptsReached { attempts }) => {
            metrics.inc_exhausted();
            tracing::error!(
                worker = worker_id,
                transaction_id = transaction.id,
                amount = %transaction.amount,
                attempts,
                "❌ #{} denied, maximum attempts reached",
                transaction.id
            );
        }
        Err(PaymentError::Storage(e)) => {
            metrics.inc_storage_failures();
            tracing::error!(
                worker = worker_id,
                transaction_id = transaction.id,
                amount = %transaction.amount,
                error = %e,
                "❌ #{} ledger unavailable, requeueing",
                transaction.id
            );
        }
        Err(PaymentError::Decode(e)) => {
            // Already decoded by the consumer; a decode failure here is a bug.
            metrics.inc_dropped();
            tracing::error!(
                worker = worker_id,
                transaction_id = transaction.id,
                error = %e,
                "❌ #{} payload rejected, dropping",
                transaction.id
            );
        }
    }
}
