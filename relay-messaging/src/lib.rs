//! Rendezvous messaging
//!
//! Message validation, per-connection stream sessions and the request
//! handlers of the relay. Processes coordinate only through the durable
//! stores in `relay_core::repository`; everything in this crate beyond
//! those stores is local to one process.

pub mod poller;
pub mod server;
pub mod stream;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use server::{Collaborators, RelayServer, Stores};
pub use stream::{EndReason, FrameCodec, SessionOutcome, SessionState, StreamTransport};
pub use validator::MessageValidator;
