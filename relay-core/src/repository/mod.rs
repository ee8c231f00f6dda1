//! Durable stores shared by every relay process
//!
//! Each store is a trait with a Redis implementation for deployments and an
//! in-memory implementation for single-node development and tests.

pub mod message;
pub mod payment_request;
pub mod presence;

use std::future::Future;
use std::time::Duration;

use redis::aio::ConnectionManager;
use tokio::time::timeout;

use crate::config::RedisConfig;
use crate::error::{Error, Result};

pub use message::{MemoryMessageStore, MessageStore, RedisMessageStore};
pub use payment_request::{MemoryPaymentRequestStore, PaymentRequestStore, RedisPaymentRequestStore};
pub use presence::{MemoryPresenceStore, PresenceStore, RedisPresenceStore};

/// Connection and key layout shared by the Redis stores
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    key_prefix: String,
    command_timeout: Duration,
}

impl RedisBackend {
    #[must_use]
    pub fn new(conn: ConnectionManager, key_prefix: impl Into<String>, command_timeout: Duration) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            command_timeout,
        }
    }

    /// Open a managed connection using the `redis` section of the config.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| Error::Configuration(format!("Invalid Redis URL: {e}")))?;
        let conn = timeout(
            Duration::from_secs(config.connect_timeout_seconds),
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| Error::Timeout("Redis connection timed out".to_string()))??;

        Ok(Self::new(conn, config.key_prefix.clone(), config.command_timeout()))
    }

    pub(crate) fn key(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.key_prefix)
    }

    pub(crate) fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Run one Redis round trip under the command timeout.
    pub(crate) async fn run<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        timeout(self.command_timeout, fut)
            .await
            .map_err(|_| Error::Timeout(format!("Redis {op} timed out")))?
            .map_err(Error::from)
    }
}
