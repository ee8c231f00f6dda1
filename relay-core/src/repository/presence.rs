use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use super::RedisBackend;
use crate::error::Result;
use crate::models::{PresenceRecord, RendezvousKey};

/// Cross-process record of open subscriber streams
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Create (or replace) the record for a key.
    async fn save(&self, key: &RendezvousKey) -> Result<PresenceRecord>;

    /// Bump `last_refreshed_at` and the store-side TTL. Recreates a record
    /// that expired in the meantime.
    async fn refresh(&self, key: &RendezvousKey) -> Result<()>;

    /// Remove the record. Removing an absent record succeeds.
    async fn delete(&self, key: &RendezvousKey) -> Result<()>;

    async fn exists(&self, key: &RendezvousKey) -> Result<bool>;

    async fn get(&self, key: &RendezvousKey) -> Result<Option<PresenceRecord>>;
}

/// Redis presence store (`presence:<key>`, JSON value, SETEX with TTL)
#[derive(Clone)]
pub struct RedisPresenceStore {
    backend: RedisBackend,
    ttl: Duration,
}

impl RedisPresenceStore {
    #[must_use]
    pub const fn new(backend: RedisBackend, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    fn presence_key(&self, key: &RendezvousKey) -> String {
        self.backend.key(&format!("presence:{key}"))
    }

    async fn write(&self, record: &PresenceRecord) -> Result<()> {
        let value = serde_json::to_string(record)?;
        let mut conn = self.backend.conn();
        self.backend
            .run(
                "SETEX",
                redis::cmd("SETEX")
                    .arg(self.presence_key(&record.rendezvous_key))
                    .arg(self.ttl.as_secs().max(1))
                    .arg(&value)
                    .query_async::<()>(&mut conn),
            )
            .await
    }
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn save(&self, key: &RendezvousKey) -> Result<PresenceRecord> {
        let record = PresenceRecord::new(*key);
        self.write(&record).await?;
        Ok(record)
    }

    async fn refresh(&self, key: &RendezvousKey) -> Result<()> {
        let mut record = self
            .get(key)
            .await?
            .unwrap_or_else(|| PresenceRecord::new(*key));
        record.touch();
        self.write(&record).await
    }

    async fn delete(&self, key: &RendezvousKey) -> Result<()> {
        let mut conn = self.backend.conn();
        self.backend
            .run(
                "DEL",
                redis::cmd("DEL")
                    .arg(self.presence_key(key))
                    .query_async::<()>(&mut conn),
            )
            .await
    }

    async fn exists(&self, key: &RendezvousKey) -> Result<bool> {
        let mut conn = self.backend.conn();
        self.backend
            .run(
                "EXISTS",
                redis::cmd("EXISTS")
                    .arg(self.presence_key(key))
                    .query_async(&mut conn),
            )
            .await
    }

    async fn get(&self, key: &RendezvousKey) -> Result<Option<PresenceRecord>> {
        let mut conn = self.backend.conn();
        let value: Option<String> = self
            .backend
            .run(
                "GET",
                redis::cmd("GET")
                    .arg(self.presence_key(key))
                    .query_async(&mut conn),
            )
            .await?;

        Ok(value
            .map(|value| serde_json::from_str(&value))
            .transpose()?)
    }
}

/// In-memory presence store
///
/// Expiry follows `tokio::time`, so paused-clock tests observe TTLs.
#[derive(Debug, Clone)]
pub struct MemoryPresenceStore {
    records: Arc<DashMap<RendezvousKey, (PresenceRecord, Instant)>>,
    ttl: Duration,
}

impl MemoryPresenceStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            ttl,
        }
    }

    fn live(&self, key: &RendezvousKey) -> Option<PresenceRecord> {
        {
            let entry = self.records.get(key)?;
            if entry.1 > Instant::now() {
                return Some(entry.0.clone());
            }
        }
        self.records
            .remove_if(key, |_, (_, deadline)| *deadline <= Instant::now());
        None
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn save(&self, key: &RendezvousKey) -> Result<PresenceRecord> {
        let record = PresenceRecord::new(*key);
        self.records
            .insert(*key, (record.clone(), Instant::now() + self.ttl));
        Ok(record)
    }

    async fn refresh(&self, key: &RendezvousKey) -> Result<()> {
        let mut record = self.live(key).unwrap_or_else(|| PresenceRecord::new(*key));
        record.touch();
        self.records.insert(*key, (record, Instant::now() + self.ttl));
        Ok(())
    }

    async fn delete(&self, key: &RendezvousKey) -> Result<()> {
        self.records.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &RendezvousKey) -> Result<bool> {
        Ok(self.live(key).is_some())
    }

    async fn get(&self, key: &RendezvousKey) -> Result<Option<PresenceRecord>> {
        Ok(self.live(key))
    }
}
