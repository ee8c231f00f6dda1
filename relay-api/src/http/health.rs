//! Health check endpoint
//!
//! Liveness plus the number of streams open on this process.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::http::AppState;

/// Health check router
pub fn create_health_router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub open_streams: usize,
}

/// Reports 503 once shutdown has begun so load balancers stop routing here
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let shutting_down = state.relay.is_shutting_down();
    let status = if shutting_down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    let body = HealthResponse {
        status: if shutting_down { "shutting_down" } else { "ok" }.to_string(),
        node_id: state.relay.node_id().to_string(),
        open_streams: state.relay.local_session_count(),
    };
    (status, Json(body))
}
