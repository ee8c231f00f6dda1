//! Per-connection stream sessions
//!
//! Each open stream is one `StreamSession` running on its own task. The
//! session owns its keep-alive timers and its delivery poller; nothing here
//! is shared with other processes.

pub mod hub;
pub mod registry;
pub mod session;
pub mod state;
pub mod transport;

/// Process-local session identifier
pub type SessionId = String;

pub use hub::StreamHub;
pub use registry::{SessionInfo, SessionRegistry};
pub use session::{SessionContext, SessionSettings, StreamSession};
pub use state::{EndReason, SessionOutcome, SessionState};
pub use transport::{FrameCodec, StreamTransport};
#[cfg(test)]
pub use transport::{ChannelClient, ChannelTransport};
