use std::sync::Arc;

use futures_util::StreamExt;
use lapin::{
    message::Delivery,
    options::{
        BasicConsumeOptions, BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
    Channel, Consumer as LapinConsumer, ExchangeKind,
};
use tokio::sync::mpsc;

use crate::error::PaymentError;
use crate::metrics::Metrics;
use crate::model::Transaction;

use super::acknowledger::Disposition;
use super::rabbit::{Pool, CONSUMER_TAG, PAYMENT_EXCHANGE, PAYMENT_QUEUE, PAYMENT_ROUTING_KEY};

// ── Public types ───────────────────────────────────────────────────────────────

/// A decoded payment attempt ready for processing.
///
/// The worker owns the raw [`Delivery`] and must resolve it exactly once
/// through a [`Disposition`].
pub struct Job {
    pub transaction: Transaction,
    pub delivery: Delivery,
}

// ── Error ──────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("consumer connection error: {0}")]
    Connection(String),
    #[error("consumer channel error: {0}")]
    Channel(String),
    #[error("topology declaration failed: {0}")]
    Topology(String),
    #[error("QoS setup failed: {0}")]
    Qos(String),
    #[error("failed to start consuming: {0}")]
    Start(String),
}

// ── RabbitConsumer ─────────────────────────────────────────────────────────────

/// RabbitMQ consumer for `payment_simulation`.
///
/// Holds its own AMQP channel for the lifetime of the process. Call
/// [`into_receiver`](Self::into_receiver) to start consuming and obtain the
/// job channel used by the worker pool.
pub struct RabbitConsumer {
    /// AMQP channel. Also keeps the parent connection alive (lapin is Arc-backed).
    channel: Channel,
    prefetch_count: u16,
    metrics: Arc<Metrics>,
}

impl RabbitConsumer {
    /// Obtain a connection from `pool`, open a channel, declare the topology
    /// and configure QoS.
    ///
    /// `prefetch_count` is the worker count: the broker pushes no more
    /// unacked deliveries than there are workers to handle them.
    pub async fn new(
        pool: &Pool,
        prefetch_count: u16,
        metrics: Arc<Metrics>,
    ) -> Result<Self, ConsumerError> {
        let conn = pool
            .get()
            .await
            .map_err(|e| ConsumerError::Connection(e.to_string()))?;

        let channel = conn
            .create_channel()
            .await
            .map_err(|e| ConsumerError::Channel(e.to_string()))?;

        declare_topology(&channel).await?;

        channel
            .basic_qos(prefetch_count, BasicQosOptions { global: false })
            .await
            .map_err(|e| ConsumerError::Qos(e.to_string()))?;

        tracing::info!(queue = PAYMENT_QUEUE, prefetch = prefetch_count, "consumer ready");

        Ok(Self {
            channel,
            prefetch_count,
            metrics,
        })
    }

    /// Start consuming with manual acknowledgment and return the job receiver.
    ///
    /// Spawns the consume loop, which drops malformed deliveries itself and
    /// forwards decoded ones. Channel capacity is `prefetch_count * 2`.
    pub async fn into_receiver(self) -> Result<mpsc::Receiver<Job>, ConsumerError> {
        let capacity = (self.prefetch_count as usize).max(1) * 2;
        let (tx, rx) = mpsc::channel::<Job>(capacity);

        let lapin_consumer = self
            .channel
            .basic_consume(
                PAYMENT_QUEUE,
                CONSUMER_TAG,
                BasicConsumeOptions {
                    no_ack: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| ConsumerError::Start(e.to_string()))?;

        tokio::spawn(consume_loop(lapin_consumer, tx, self.metrics));

        tracing::info!(queue = PAYMENT_QUEUE, "▶️  waiting for payment attempts");

        Ok(rx)
    }
}

// ── Background task ────────────────────────────────────────────────────────────

/// Maps raw lapin deliveries into [`Job`]s for the lifetime of the consumer.
async fn consume_loop(mut consumer: LapinConsumer, tx: mpsc::Sender<Job>, metrics: Arc<Metrics>) {
    while let Some(result) = consumer.next().await {
        let delivery = match result {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "consumer stream error");
                break;
            }
        };

        metrics.inc_received();

        let transaction = match Transaction::decode(&delivery.data) {
            Ok(t) => t,
            Err(e) => {
                // The body may hold card data: log its size, never its content.
                tracing::warn!(
                    delivery_tag = delivery.delivery_tag,
                    bytes = delivery.data.len(),
                    error = %e,
                    "⚠️  malformed payment message, dropping"
                );
                metrics.inc_dropped();
                let outcome = Err(PaymentError::Decode(e));
                Disposition::for_result(&outcome).apply(&delivery).await;
                continue;
            }
        };

        if tx.send(Job { transaction, delivery }).await.is_err() {
            // Receiver dropped: the worker pool is shutting down. The unacked
            // delivery goes back to the queue when the channel closes.
            break;
        }
    }

    tracing::debug!("consume loop stopped");
}

// ── Topology ───────────────────────────────────────────────────────────────────

/// Declare the consumer-side AMQP topology.
///
/// - Exchange `payment.events.exchange` (direct, durable)
/// - Queue `payment_simulation` (durable)
/// - Binding: queue ← exchange via `payment.simulation.request`
async fn declare_topology(channel: &Channel) -> Result<(), ConsumerError> {
    channel
        .exchange_declare(
            PAYMENT_EXCHANGE,
            ExchangeKind::Direct,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| ConsumerError::Topology(format!("exchange '{PAYMENT_EXCHANGE}': {e}")))?;
    tracing::debug!(exchange = PAYMENT_EXCHANGE, "exchange declared");

    let queue = channel
        .queue_declare(
            PAYMENT_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| ConsumerError::Topology(format!("queue '{PAYMENT_QUEUE}': {e}")))?;
    tracing::debug!(
        queue = PAYMENT_QUEUE,
        messages = queue.message_count(),
        consumers = queue.consumer_count(),
        "queue declared"
    );

    channel
        .queue_bind(
            PAYMENT_QUEUE,
            PAYMENT_EXCHANGE,
            PAYMENT_ROUTING_KEY,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| {
            ConsumerError::Topology(format!(
                "bind '{PAYMENT_QUEUE}' → '{PAYMENT_EXCHANGE}' via '{PAYMENT_ROUTING_KEY}': {e}"
            ))
        })?;
    tracing::debug!(routing_key = PAYMENT_ROUTING_KEY, "binding created");

    Ok(())
}
