//! Payment attempt worker.
//!
//! Consumes payment attempts from RabbitMQ, simulates the charge, records every
//! attempt in Postgres, decides between approve / retry / give up from the
//! recorded history, acknowledges the delivery accordingly, and notifies the
//! backend of terminal outcomes.

pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod messaging;
pub mod metrics;
pub mod model;
pub mod notifier;
pub mod processor;
pub mod retry;
pub mod shutdown;
pub mod worker;

pub use error::PaymentError;
