use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::error;

use super::RedisBackend;
use crate::error::Result;
use crate::models::{MessageId, MessageRecord, RendezvousKey};

/// Per-channel ordered message storage
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a record to the end of its channel.
    async fn insert(&self, record: &MessageRecord) -> Result<MessageId>;

    /// All unacknowledged records for a key, in insertion order.
    async fn list(&self, key: &RendezvousKey) -> Result<Vec<MessageRecord>>;

    /// Remove one record. Removing an absent id succeeds.
    async fn delete(&self, key: &RendezvousKey, id: &MessageId) -> Result<()>;
}

/// Redis message store
///
/// A channel is a list of ids (`messages:<key>:ids`) for ordering plus a
/// hash of id to encoded message (`messages:<key>:data`). Both keys expire
/// `ttl` after the latest insert.
#[derive(Clone)]
pub struct RedisMessageStore {
    backend: RedisBackend,
    ttl: Duration,
}

impl RedisMessageStore {
    #[must_use]
    pub const fn new(backend: RedisBackend, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    fn keys(&self, key: &RendezvousKey) -> (String, String) {
        (
            self.backend.key(&format!("messages:{key}:ids")),
            self.backend.key(&format!("messages:{key}:data")),
        )
    }
}

#[async_trait]
impl MessageStore for RedisMessageStore {
    async fn insert(&self, record: &MessageRecord) -> Result<MessageId> {
        let (ids_key, data_key) = self.keys(&record.rendezvous_key);
        let id = record.id.to_simple();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let mut conn = self.backend.conn();

        self.backend
            .run(
                "message insert",
                redis::pipe()
                    .atomic()
                    .hset(&data_key, &id, record.encode())
                    .ignore()
                    .rpush(&ids_key, &id)
                    .ignore()
                    .expire(&data_key, ttl)
                    .ignore()
                    .expire(&ids_key, ttl)
                    .ignore()
                    .query_async::<()>(&mut conn),
            )
            .await?;

        Ok(record.id)
    }

    async fn list(&self, key: &RendezvousKey) -> Result<Vec<MessageRecord>> {
        let (ids_key, data_key) = self.keys(key);
        let mut conn = self.backend.conn();

        let ids: Vec<String> = self
            .backend
            .run(
                "LRANGE",
                redis::cmd("LRANGE")
                    .arg(&ids_key)
                    .arg(0)
                    .arg(-1)
                    .query_async(&mut conn),
            )
            .await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<Vec<u8>>> = self
            .backend
            .run(
                "HMGET",
                redis::cmd("HMGET").arg(&data_key).arg(&ids).query_async(&mut conn),
            )
            .await?;

        let mut records = Vec::with_capacity(values.len());
        for (id, value) in ids.iter().zip(values) {
            // Acked between LRANGE and HMGET
            let Some(bytes) = value else { continue };
            match MessageRecord::decode(*key, &bytes) {
                Ok(record) => records.push(record),
                Err(e) => error!(
                    rendezvous_key = %key,
                    message_id = %id,
                    error = %e,
                    "Skipping undecodable stored message"
                ),
            }
        }
        Ok(records)
    }

    async fn delete(&self, key: &RendezvousKey, id: &MessageId) -> Result<()> {
        let (ids_key, data_key) = self.keys(key);
        let id = id.to_simple();
        let mut conn = self.backend.conn();

        self.backend
            .run(
                "message delete",
                redis::pipe()
                    .atomic()
                    .hdel(&data_key, &id)
                    .ignore()
                    .lrem(&ids_key, 0, &id)
                    .ignore()
                    .query_async::<()>(&mut conn),
            )
            .await
    }
}

/// In-memory message store for tests and single-node runs
///
/// Clones share the same channels, so several relays can be pointed at one
/// instance. Channels never expire.
#[derive(Debug, Clone, Default)]
pub struct MemoryMessageStore {
    channels: Arc<Mutex<HashMap<RendezvousKey, Vec<MessageRecord>>>>,
}

impl MemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all channels
    pub async fn total(&self) -> usize {
        self.channels.lock().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert(&self, record: &MessageRecord) -> Result<MessageId> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(record.rendezvous_key)
            .or_default()
            .push(record.clone());
        Ok(record.id)
    }

    async fn list(&self, key: &RendezvousKey) -> Result<Vec<MessageRecord>> {
        let channels = self.channels.lock().await;
        Ok(channels.get(key).cloned().unwrap_or_default())
    }

    async fn delete(&self, key: &RendezvousKey, id: &MessageId) -> Result<()> {
        let mut channels = self.channels.lock().await;
        if let Some(records) = channels.get_mut(key) {
            records.retain(|record| record.id != *id);
            if records.is_empty() {
                channels.remove(key);
            }
        }
        Ok(())
    }
}
