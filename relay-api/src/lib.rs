// Relay API Library
//
// HTTP and WebSocket transport for the rendezvous relay

pub mod http;

pub use http::{create_router, AppState};
