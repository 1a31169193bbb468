use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicNackOptions},
};

use crate::error::PaymentError;

/// What the broker is told about one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// `basic.ack`: the delivery is done with, successfully or terminally.
    Accept,
    /// `basic.nack` with `requeue = true`: hand it back for another attempt.
    Requeue,
    /// `basic.nack` with `requeue = false`: poison message, retrying cannot help.
    Drop,
}

impl Disposition {
    /// Map a delivery-level result onto a disposition.
    ///
    /// | Result                         | Disposition |
    /// |--------------------------------|-------------|
    /// | `Ok(())` (approved)            | Accept      |
    /// | `MaxAttemptsReached`           | Accept      |
    /// | `Declined` (retryable)         | Requeue     |
    /// | `Storage`                      | Requeue     |
    /// | `Decode`                       | Drop        |
    pub fn for_result(result: &Result<(), PaymentError>) -> Self {
        match result {
            Ok(()) => Self::Accept,
            Err(PaymentError::MaxAttemptsReached { .. }) => Self::Accept,
            Err(PaymentError::Declined { .. }) => Self::Requeue,
            Err(PaymentError::Storage(_)) => Self::Requeue,
            Err(PaymentError::Decode(_)) => Self::Drop,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "ack",
            Self::Requeue => "nack-requeue",
            Self::Drop => "nack-drop",
        }
    }

    /// Resolve `delivery` on the broker. Broker-side failures are logged; the
    /// delivery will be redelivered when the channel closes anyway.
    pub async fn apply(self, delivery: &Delivery) {
        let result = match self {
            Self::Accept => delivery.ack(BasicAckOptions::default()).await,
            Self::Requeue => {
                delivery
                    .nack(BasicNackOptions {
                        multiple: false,
                        requeue: true,
                    })
                    .await
            }
            Self::Drop => {
                delivery
                    .nack(BasicNackOptions {
                        multiple: false,
                        requeue: false,
                    })
                    .await
            }
        };

        if let Err(e) = result {
            tracing::error!(
                delivery_tag = delivery.delivery_tag,
                disposition = self.as_str(),
                error = %e,
                "❌ failed to resolve delivery"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerError;
    use crate::model::Transaction;

    #[test]
    fn approval_and_exhaustion_are_accepted() {
        assert_eq!(Disposition::for_result(&Ok(())), Disposition::Accept);
        assert_eq!(
            Disposition::for_result(&Err(PaymentError::MaxAttemptsReached { attempts: 3 })),
            Disposition::Accept
        );
    }

    #[test]
    fn retryable_and_storage_failures_are_requeued() {
        assert_eq!(
            Disposition::for_result(&Err(PaymentError::Declined { attempt: 1 })),
            Disposition::Requeue
        );
        assert_eq!(
            Disposition::for_result(&Err(PaymentError::Storage(LedgerError::Read(
                "connection reset".into()
            )))),
            Disposition::Requeue
        );
    }

    #[test]
    fn malformed_messages_are_dropped() {
        let decode = Transaction::decode(br#"{"ID":"x"}"#).unwrap_err();
        assert_eq!(
            Disposition::for_result(&Err(PaymentError::Decode(decode))),
            Disposition::Drop
        );
    }
}
