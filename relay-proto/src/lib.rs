//! Rendezvous Relay Protocol Definitions
//!
//! Protobuf types shared by the relay, its clients and its durable stores.
//! Messages are stored exactly as they are sent over the wire, so the same
//! encoding is used for HTTP bodies, WebSocket frames and Redis values.

// Messaging API
pub mod messaging {
    #[allow(clippy::all)]
    #[allow(warnings)]
    include!("relay_messaging_v1.rs");

    mod ext;
}

pub use prost::Message as ProtoMessage;
