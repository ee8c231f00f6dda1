use chrono::{DateTime, Utc};
use relay_proto::messaging::request_to_receive_bill::ExchangeData;
use serde::{Deserialize, Serialize};

use super::key::{PublicKey, RendezvousKey};

/// Amount requested by a payee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentExchange {
    /// Fixed amount of the base token
    Exact {
        currency: String,
        exchange_rate: f64,
        native_amount: f64,
        quarks: u64,
    },
    /// Fiat amount priced at payment time
    Partial { currency: String, native_amount: f64 },
}

impl From<&ExchangeData> for PaymentExchange {
    fn from(data: &ExchangeData) -> Self {
        match data {
            ExchangeData::Exact(exact) => Self::Exact {
                currency: exact.currency.to_lowercase(),
                exchange_rate: exact.exchange_rate,
                native_amount: exact.native_amount,
                quarks: exact.quarks,
            },
            ExchangeData::Partial(partial) => Self::Partial {
                currency: partial.currency.to_lowercase(),
                native_amount: partial.native_amount,
            },
        }
    }
}

/// Payment request left behind by an accepted `RequestToReceiveBill`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequestRecord {
    pub rendezvous_key: RendezvousKey,
    pub destination: PublicKey,
    pub exchange: PaymentExchange,
    /// Validated ASCII domain, when the request named one
    pub domain: Option<String>,
    /// Whether the domain was verified against its owner
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}
