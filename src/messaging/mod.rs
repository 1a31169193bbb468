mod acknowledger;
mod consumer;
mod rabbit;

pub use acknowledger::Disposition;
pub use consumer::{ConsumerError, Job, RabbitConsumer};
pub use rabbit::{
    build_pool, Pool, RabbitError, CONSUMER_TAG, PAYMENT_EXCHANGE, PAYMENT_QUEUE,
    PAYMENT_ROUTING_KEY,
};
