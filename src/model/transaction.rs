use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Card details carried by a payment attempt.
///
/// Opaque to the worker: never persisted, never logged. `Debug` is redacted so
/// a stray `{:?}` on a [`Transaction`] cannot leak the PAN or CVV.
#[derive(Clone, Default, Deserialize)]
pub struct Card {
    #[serde(rename = "Number", alias = "number", default, deserialize_with = "null_as_default")]
    pub number: String,

    #[serde(
        rename = "HolderName",
        alias = "holderName",
        alias = "holder_name",
        default,
        deserialize_with = "null_as_default"
    )]
    pub holder_name: String,

    #[serde(rename = "CVV", alias = "cvv", default, deserialize_with = "null_as_default")]
    pub cvv: String,

    #[serde(
        rename = "ExpiryDate",
        alias = "expiryDate",
        alias = "expiry_date",
        default,
        deserialize_with = "null_as_default"
    )]
    pub expiry_date: String,
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Card { .. }")
    }
}

/// Incoming payment attempt received from RabbitMQ.
///
/// Published to: `payment.events.exchange` (direct)
/// Routing key:  `payment.simulation.request`
/// Queue:        `payment_simulation`
///
/// Both the PascalCase field names (`ID`, `Amount`, `Card`) and the camelCase
/// names emitted by the backend publisher (`id`, `amount`, `card`) are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    /// Stable across redeliveries; the ledger key is its decimal string form.
    #[serde(rename = "ID", alias = "id")]
    pub id: i64,

    /// Must be a JSON number; quoted amounts are malformed.
    #[serde(rename = "Amount", alias = "amount", with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    #[serde(rename = "Card", alias = "card", default, deserialize_with = "null_as_default")]
    pub card: Card,
}

/// Treat an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The delivery body could not be turned into a [`Transaction`].
#[derive(Debug, thiserror::Error)]
#[error("malformed transaction payload: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

impl Transaction {
    /// Deserialize one AMQP delivery body.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Key under which attempts for this transaction are recorded.
    pub fn ledger_key(&self) -> String {
        self.id.to_string()
    }
}
