use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::RedisBackend;
use crate::error::Result;
use crate::models::{PaymentRequestRecord, RendezvousKey};

#[async_trait]
pub trait PaymentRequestStore: Send + Sync {
    /// Persist the request for its rendezvous key, replacing any earlier one.
    async fn save(&self, record: &PaymentRequestRecord) -> Result<()>;

    async fn get(&self, key: &RendezvousKey) -> Result<Option<PaymentRequestRecord>>;
}

/// Redis payment request store (`payment_request:<key>`, JSON, no TTL)
#[derive(Clone)]
pub struct RedisPaymentRequestStore {
    backend: RedisBackend,
}

impl RedisPaymentRequestStore {
    #[must_use]
    pub const fn new(backend: RedisBackend) -> Self {
        Self { backend }
    }

    fn record_key(&self, key: &RendezvousKey) -> String {
        self.backend.key(&format!("payment_request:{key}"))
    }
}

#[async_trait]
impl PaymentRequestStore for RedisPaymentRequestStore {
    async fn save(&self, record: &PaymentRequestRecord) -> Result<()> {
        let value = serde_json::to_string(record)?;
        let mut conn = self.backend.conn();
        self.backend
            .run(
                "SET",
                redis::cmd("SET")
                    .arg(self.record_key(&record.rendezvous_key))
                    .arg(&value)
                    .query_async::<()>(&mut conn),
            )
            .await
    }

    async fn get(&self, key: &RendezvousKey) -> Result<Option<PaymentRequestRecord>> {
        let mut conn = self.backend.conn();
        let value: Option<String> = self
            .backend
            .run(
                "GET",
                redis::cmd("GET").arg(self.record_key(key)).query_async(&mut conn),
            )
            .await?;

        Ok(value
            .map(|value| serde_json::from_str(&value))
            .transpose()?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPaymentRequestStore {
    records: Arc<DashMap<RendezvousKey, PaymentRequestRecord>>,
}

impl MemoryPaymentRequestStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRequestStore for MemoryPaymentRequestStore {
    async fn save(&self, record: &PaymentRequestRecord) -> Result<()> {
        self.records.insert(record.rendezvous_key, record.clone());
        Ok(())
    }

    async fn get(&self, key: &RendezvousKey) -> Result<Option<PaymentRequestRecord>> {
        Ok(self.records.get(key).map(|record| record.clone()))
    }
}
