//! Server lifecycle management
//!
//! Binds the HTTP listener, serves the relay router and, on SIGTERM or
//! Ctrl+C, closes every open message stream before the listener drains.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use relay_api::{create_router, AppState};
use relay_core::Config;
use relay_messaging::RelayServer;

pub struct HttpServer {
    config: Config,
    relay: RelayServer,
}

impl HttpServer {
    pub const fn new(config: Config, relay: RelayServer) -> Self {
        Self { config, relay }
    }

    /// Start the HTTP server and wait for shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut http_handle = self.start_http_server(shutdown_rx).await?;
        info!(node_id = %self.relay.node_id(), "Relay started");

        let stopped_early = tokio::select! {
            _ = &mut http_handle => {
                error!("HTTP server stopped unexpectedly");
                true
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
                false
            }
        };

        // Streams end first so their close frames go out before the listener drains
        self.relay.shutdown();
        self.drain_sessions().await;
        let _ = shutdown_tx.send(true);

        if !stopped_early {
            if let Err(e) = http_handle.await {
                error!("HTTP server task failed: {}", e);
            }
        }

        info!("Relay stopped");
        Ok(())
    }

    async fn drain_sessions(&self) {
        let drain_timeout = Duration::from_secs(10);
        let drain_poll_interval = Duration::from_millis(100);
        let deadline = tokio::time::Instant::now() + drain_timeout;

        loop {
            let remaining = self.relay.local_session_count();
            if remaining == 0 {
                info!("All message streams closed");
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    "Drain timeout reached with {} stream(s) still open, proceeding with shutdown",
                    remaining
                );
                break;
            }
            tokio::time::sleep(drain_poll_interval).await;
        }
    }

    /// Bind the listener and serve with graceful shutdown support
    async fn start_http_server(&self, shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<JoinHandle<()>> {
        let http_address = self.config.http_address();
        let http_addr: std::net::SocketAddr = http_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid HTTP address '{http_address}': {e}"))?;

        let listener = tokio::net::TcpListener::bind(http_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind HTTP address {http_addr}: {e}"))?;
        info!("HTTP server listening on {}", http_addr);

        let router = create_router(AppState::new(
            self.relay.clone(),
            self.config.messaging.max_frame_size,
        ));

        let handle = tokio::spawn(async move {
            let mut rx = shutdown_rx;
            let graceful = async move {
                let _ = rx.changed().await;
            };

            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("HTTP server error: {}", e);
            }

            info!("HTTP server shut down gracefully");
        });

        Ok(handle)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C signal");
            }
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
