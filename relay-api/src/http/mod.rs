// Module: http
// HTTP routes and the WebSocket stream endpoint

pub mod error;
pub mod health;
pub mod messages;
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

use axum::Router;
use relay_messaging::RelayServer;
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub relay: RelayServer,
    /// Largest WebSocket frame accepted from clients
    pub max_frame_size: usize,
}

impl AppState {
    #[must_use]
    pub const fn new(relay: RelayServer, max_frame_size: usize) -> Self {
        Self {
            relay,
            max_frame_size,
        }
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::create_health_router())
        .merge(messages::create_messages_router())
        .merge(websocket::create_websocket_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
