mod server;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use relay_core::{
    logging,
    repository::{
        MemoryMessageStore, MemoryPaymentRequestStore, MemoryPresenceStore, RedisBackend,
        RedisMessageStore, RedisPaymentRequestStore, RedisPresenceStore,
    },
    service::{Ed25519Verifier, MemoryAccountResolver, RedisAccountResolver, WellKnownDomainVerifier},
    Config,
};
use relay_messaging::{Collaborators, RelayServer, Stores};

use server::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(about = "Rendezvous message relay", long_about = None)]
struct Args {
    /// Path to a YAML/TOML config file
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<String>,

    /// Node ID (auto-generated from hostname if not provided)
    #[arg(long, env = "NODE_ID")]
    node_id: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

/// Generate a unique node ID for this server instance
fn generate_node_id() -> String {
    use std::net::UdpSocket;

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    let local_ip = UdpSocket::bind("0.0.0.0:0")
        .and_then(|s| s.connect("8.8.8.8:80").map(|()| s))
        .and_then(|s| s.local_addr())
        .map_or_else(|_| "0.0.0.0".to_string(), |addr| addr.ip().to_string());

    let suffix = nanoid::nanoid!(6);

    format!("{hostname}_{local_ip}-{suffix}")
}

/// Redis-backed stores when a URL is configured, process-local ones otherwise.
async fn init_stores(config: &Config) -> Result<(Stores, Collaborators)> {
    let messaging = &config.messaging;
    let domains = Arc::new(WellKnownDomainVerifier::new(&config.domain_verification)?);

    if config.redis.is_enabled() {
        info!("Connecting to Redis...");
        let backend = RedisBackend::connect(&config.redis).await?;
        info!("Redis connected");

        let stores = Stores {
            messages: Arc::new(RedisMessageStore::new(backend.clone(), messaging.message_ttl())),
            presence: Arc::new(RedisPresenceStore::new(backend.clone(), messaging.record_max_age())),
            payment_requests: Arc::new(RedisPaymentRequestStore::new(backend.clone())),
        };
        let collaborators = Collaborators {
            accounts: Arc::new(RedisAccountResolver::new(backend)),
            domains,
            signatures: Arc::new(Ed25519Verifier),
        };
        return Ok((stores, collaborators));
    }

    warn!("Redis URL not set, using in-memory stores (single node only, no account data)");
    let stores = Stores {
        messages: Arc::new(MemoryMessageStore::new()),
        presence: Arc::new(MemoryPresenceStore::new(messaging.record_max_age())),
        payment_requests: Arc::new(MemoryPaymentRequestStore::new()),
    };
    let collaborators = Collaborators {
        accounts: Arc::new(MemoryAccountResolver::new()),
        domains,
        signatures: Arc::new(Ed25519Verifier),
    };
    Ok((stores, collaborators))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let config = Config::load(args.config.as_deref())?;

    // 1.5. Validate configuration (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }
    if args.check_config {
        println!("Configuration OK");
        return Ok(());
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    let node_id = args.node_id.unwrap_or_else(generate_node_id);
    info!(node_id = %node_id, "Relay starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Initialize stores and collaborators
    let (stores, collaborators) = init_stores(&config).await?;

    // 4. Build the relay
    let relay = RelayServer::new(node_id, config.messaging.clone(), stores, collaborators);

    // 5. Serve until a shutdown signal
    HttpServer::new(config, relay).start().await
}
