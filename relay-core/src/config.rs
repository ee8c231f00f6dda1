use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub logging: LoggingConfig,
    pub messaging: MessagingConfig,
    pub domain_verification: DomainVerificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Empty selects the in-memory stores (single node only).
    pub url: String,
    pub key_prefix: String,
    pub connect_timeout_seconds: u64,
    pub command_timeout_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "relay:".to_string(),
            connect_timeout_seconds: 5,
            command_timeout_seconds: 5,
        }
    }
}

impl RedisConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.url.trim().is_empty()
    }

    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Inclusive amount bounds for one currency, in native units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrencyLimit {
    pub min: f64,
    pub max: f64,
}

/// Rendezvous messaging and stream keep-alive settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Interval between server-sent pings on a keep-alive stream
    pub ping_delay_ms: u64,
    /// A keep-alive stream that sends no ping for this long is terminated
    pub keep_alive_recv_timeout_ms: u64,
    /// Absolute lifetime of a single stream connection
    pub record_max_age_secs: u64,
    /// How often each open stream re-reads the message store
    pub poll_interval_ms: u64,
    /// Idle channels are dropped from the store after this long
    pub message_ttl_secs: u64,
    pub max_frame_size: usize,
    /// Reject client sends to keys without a presence record
    pub require_active_stream: bool,
    /// Keyed by lowercase currency code
    pub currency_limits: BTreeMap<String, CurrencyLimit>,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        let mut currency_limits = BTreeMap::new();
        currency_limits.insert(
            "kin".to_string(),
            CurrencyLimit {
                min: 5_000.0,
                max: 100_000.0,
            },
        );
        currency_limits.insert("usd".to_string(), CurrencyLimit { min: 0.05, max: 1.0 });

        Self {
            ping_delay_ms: 5_000,
            keep_alive_recv_timeout_ms: 10_000,
            record_max_age_secs: 120,
            poll_interval_ms: 250,
            message_ttl_secs: 600,
            max_frame_size: 64 * 1024,
            require_active_stream: false,
            currency_limits,
        }
    }
}

impl MessagingConfig {
    #[must_use]
    pub const fn ping_delay(&self) -> Duration {
        Duration::from_millis(self.ping_delay_ms)
    }

    #[must_use]
    pub const fn keep_alive_recv_timeout(&self) -> Duration {
        Duration::from_millis(self.keep_alive_recv_timeout_ms)
    }

    #[must_use]
    pub const fn record_max_age(&self) -> Duration {
        Duration::from_secs(self.record_max_age_secs)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn message_ttl(&self) -> Duration {
        Duration::from_secs(self.message_ttl_secs)
    }

    #[must_use]
    pub fn currency_limit(&self, currency: &str) -> Option<CurrencyLimit> {
        self.currency_limits.get(&currency.to_lowercase()).copied()
    }
}

/// Well-known document based domain ownership checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainVerificationConfig {
    pub well_known_path: String,
    pub request_timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
}

impl Default for DomainVerificationConfig {
    fn default() -> Self {
        Self {
            well_known_path: "/.well-known/code-payments.json".to_string(),
            request_timeout_ms: 5_000,
            cache_ttl_secs: 300,
            cache_capacity: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            } else {
                return Err(ConfigError::NotFound(path.to_string()));
            }
        }

        // RELAY_MESSAGING__POLL_INTERVAL_MS, RELAY_REDIS__URL, ...
        builder = builder.add_source(
            Environment::with_prefix("RELAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Check cross-field constraints, reporting every violation at once.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let messaging = &self.messaging;

        if self.server.http_port == 0 {
            errors.push("server.http_port must be non-zero".to_string());
        }
        if messaging.ping_delay_ms == 0 {
            errors.push("messaging.ping_delay_ms must be non-zero".to_string());
        }
        if messaging.ping_delay() >= messaging.keep_alive_recv_timeout() {
            errors.push(format!(
                "messaging.ping_delay_ms ({}) must be shorter than messaging.keep_alive_recv_timeout_ms ({})",
                messaging.ping_delay_ms, messaging.keep_alive_recv_timeout_ms
            ));
        }
        if messaging.keep_alive_recv_timeout() >= messaging.record_max_age() {
            errors.push(format!(
                "messaging.keep_alive_recv_timeout_ms ({}) must be shorter than messaging.record_max_age_secs ({}s)",
                messaging.keep_alive_recv_timeout_ms, messaging.record_max_age_secs
            ));
        }
        if messaging.poll_interval_ms == 0 || messaging.poll_interval_ms >= 1_000 {
            errors.push(format!(
                "messaging.poll_interval_ms ({}) must be between 1 and 999",
                messaging.poll_interval_ms
            ));
        }
        if messaging.message_ttl_secs == 0 {
            errors.push("messaging.message_ttl_secs must be non-zero".to_string());
        }
        for (currency, limit) in &messaging.currency_limits {
            if !(limit.min >= 0.0 && limit.min <= limit.max) {
                errors.push(format!(
                    "messaging.currency_limits.{currency}: min ({}) must be non-negative and not exceed max ({})",
                    limit.min, limit.max
                ));
            }
        }
        if !self.domain_verification.well_known_path.starts_with('/') {
            errors.push("domain_verification.well_known_path must start with '/'".to_string());
        }
        if self.domain_verification.request_timeout_ms == 0 {
            errors.push("domain_verification.request_timeout_ms must be non-zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Get HTTP address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}
