use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DomainVerificationConfig;
use crate::error::{Error, Result};
use crate::models::PublicKey;
use crate::validation::ascii_base_domain;

/// Checks whether a key owns a domain
#[async_trait]
pub trait DomainVerifier: Send + Sync {
    /// `domain` is an already validated ASCII domain; ownership is checked
    /// for its base domain. Unreachable or malformed documents verify as
    /// `false` rather than failing.
    async fn verify_ownership(&self, owner: &PublicKey, domain: &str) -> Result<bool>;
}

/// `/.well-known/code-payments.json`
#[derive(Debug, Deserialize)]
struct WellKnownDocument {
    #[serde(default)]
    public_keys: Vec<String>,
}

/// Verifies ownership against the domain's well-known document
///
/// `https://<base domain><well_known_path>` must list the owner's base58
/// key under `public_keys`. Fetched answers are cached per
/// (owner, base domain).
#[derive(Clone)]
pub struct WellKnownDomainVerifier {
    client: reqwest::Client,
    well_known_path: String,
    base_url_override: Option<String>,
    cache: Cache<(PublicKey, String), bool>,
}

impl WellKnownDomainVerifier {
    pub fn new(config: &DomainVerificationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {e}")))?;

        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs))
            .build();

        Ok(Self {
            client,
            well_known_path: config.well_known_path.clone(),
            base_url_override: None,
            cache,
        })
    }

    /// Fetch every document from `base_url` instead of the domain itself.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    fn document_url(&self, base_domain: &str) -> String {
        match &self.base_url_override {
            Some(base_url) => format!("{}{}", base_url.trim_end_matches('/'), self.well_known_path),
            None => format!("https://{base_domain}{}", self.well_known_path),
        }
    }

    async fn fetch_public_keys(&self, base_domain: &str) -> std::result::Result<Vec<String>, reqwest::Error> {
        let document: WellKnownDocument = self
            .client
            .get(self.document_url(base_domain))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(document.public_keys)
    }
}

#[async_trait]
impl DomainVerifier for WellKnownDomainVerifier {
    async fn verify_ownership(&self, owner: &PublicKey, domain: &str) -> Result<bool> {
        let base_domain = ascii_base_domain(domain);
        let cache_key = (*owner, base_domain.clone());
        if let Some(owned) = self.cache.get(&cache_key).await {
            return Ok(owned);
        }

        let public_keys = match self.fetch_public_keys(&base_domain).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(domain = %base_domain, error = %e, "Domain verification request failed");
                return Ok(false);
            }
        };

        let owner_base58 = owner.to_base58();
        let owned = public_keys.iter().any(|key| key.trim() == owner_base58);
        debug!(domain = %base_domain, owner = %owner, owned, "Fetched domain verification document");

        self.cache.insert(cache_key, owned).await;
        Ok(owned)
    }
}

/// Static ownership table for tests and development
#[derive(Debug, Clone, Default)]
pub struct MemoryDomainVerifier {
    owners: Arc<RwLock<HashMap<String, HashSet<PublicKey>>>>,
}

impl MemoryDomainVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `owner` as an owner of `domain`'s base domain.
    pub fn allow(&self, owner: PublicKey, domain: &str) {
        if let Ok(mut owners) = self.owners.write() {
            owners
                .entry(ascii_base_domain(domain))
                .or_default()
                .insert(owner);
        }
    }
}

#[async_trait]
impl DomainVerifier for MemoryDomainVerifier {
    async fn verify_ownership(&self, owner: &PublicKey, domain: &str) -> Result<bool> {
        let owners = self
            .owners
            .read()
            .map_err(|_| Error::Internal("domain table lock poisoned".to_string()))?;
        Ok(owners
            .get(&ascii_base_domain(domain))
            .is_some_and(|keys| keys.contains(owner)))
    }
}
