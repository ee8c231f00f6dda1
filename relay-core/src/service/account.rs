use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::models::{AccountInfo, PublicKey};
use crate::repository::RedisBackend;

/// Resolves a public key to the account it identifies
#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// `None` when the key is not a known account.
    async fn resolve_account(&self, account: &PublicKey) -> Result<Option<AccountInfo>>;
}

/// Reads account records published by the account service at
/// `<prefix>account:<base58 key>`.
#[derive(Clone)]
pub struct RedisAccountResolver {
    backend: RedisBackend,
}

impl RedisAccountResolver {
    #[must_use]
    pub const fn new(backend: RedisBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl AccountResolver for RedisAccountResolver {
    async fn resolve_account(&self, account: &PublicKey) -> Result<Option<AccountInfo>> {
        let mut conn = self.backend.conn();
        let value: Option<String> = self
            .backend
            .run(
                "GET",
                redis::cmd("GET")
                    .arg(self.backend.key(&format!("account:{account}")))
                    .query_async(&mut conn),
            )
            .await?;

        Ok(value
            .map(|value| serde_json::from_str(&value))
            .transpose()?)
    }
}

/// In-memory account directory
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountResolver {
    accounts: Arc<DashMap<PublicKey, AccountInfo>>,
}

impl MemoryAccountResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, info: AccountInfo) {
        self.accounts.insert(info.account, info);
    }
}

#[async_trait]
impl AccountResolver for MemoryAccountResolver {
    async fn resolve_account(&self, account: &PublicKey) -> Result<Option<AccountInfo>> {
        Ok(self.accounts.get(account).map(|info| info.clone()))
    }
}
