//! Transport abstraction for message streams
//!
//! A session only sees decoded frames. WebSocket, in-process channels or
//! any other duplex byte stream plug in by implementing `StreamTransport`.

use prost::Message as _;
use relay_proto::messaging::{
    client_stream_frame, server_stream_frame, ClientStreamFrame, ServerStreamFrame,
};
#[cfg(test)]
use tokio::sync::mpsc;

/// Duplex connection to one subscriber
#[async_trait::async_trait]
pub trait StreamTransport: Send {
    /// Next client frame. `None` once the client has gone away.
    async fn recv(&mut self) -> Option<Result<client_stream_frame::Frame, String>>;

    /// Queue a frame for the client without waiting on the network.
    fn send(&self, frame: server_stream_frame::Frame) -> Result<(), String>;
}

/// Binary frame codec shared by byte-oriented transports
pub struct FrameCodec;

impl FrameCodec {
    /// Decode a client frame. Frames without a body are rejected.
    pub fn decode_client_frame(bytes: &[u8]) -> Result<client_stream_frame::Frame, String> {
        ClientStreamFrame::decode(bytes)
            .map_err(|e| format!("Failed to decode client frame: {e}"))?
            .frame
            .ok_or_else(|| "Client frame has no body".to_string())
    }

    #[must_use]
    pub fn encode_server_frame(frame: server_stream_frame::Frame) -> Vec<u8> {
        ServerStreamFrame { frame: Some(frame) }.encode_to_vec()
    }

    #[must_use]
    pub fn encode_client_frame(frame: client_stream_frame::Frame) -> Vec<u8> {
        ClientStreamFrame { frame: Some(frame) }.encode_to_vec()
    }

    pub fn decode_server_frame(bytes: &[u8]) -> Result<server_stream_frame::Frame, String> {
        ServerStreamFrame::decode(bytes)
            .map_err(|e| format!("Failed to decode server frame: {e}"))?
            .frame
            .ok_or_else(|| "Server frame has no body".to_string())
    }
}

/// In-process transport backed by bounded channels
#[cfg(test)]
pub struct ChannelTransport {
    inbound: mpsc::Receiver<client_stream_frame::Frame>,
    outbound: mpsc::Sender<server_stream_frame::Frame>,
}

/// The client side of a `ChannelTransport`
#[cfg(test)]
pub struct ChannelClient {
    outbound: Option<mpsc::Sender<client_stream_frame::Frame>>,
    inbound: mpsc::Receiver<server_stream_frame::Frame>,
}

#[cfg(test)]
impl ChannelTransport {
    /// Create a connected transport/client pair. A client that falls
    /// `capacity` frames behind fails the session.
    #[must_use]
    pub fn pair(capacity: usize) -> (Self, ChannelClient) {
        let (client_tx, client_rx) = mpsc::channel(capacity);
        let (server_tx, server_rx) = mpsc::channel(capacity);
        (
            Self {
                inbound: client_rx,
                outbound: server_tx,
            },
            ChannelClient {
                outbound: Some(client_tx),
                inbound: server_rx,
            },
        )
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl StreamTransport for ChannelTransport {
    async fn recv(&mut self) -> Option<Result<client_stream_frame::Frame, String>> {
        self.inbound.recv().await.map(Ok)
    }

    fn send(&self, frame: server_stream_frame::Frame) -> Result<(), String> {
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                "Channel full: client too slow to consume frames".to_string()
            }
            mpsc::error::TrySendError::Closed(_) => {
                "Channel closed: client disconnected".to_string()
            }
        })
    }
}

#[cfg(test)]
impl ChannelClient {
    pub async fn send(&self, frame: client_stream_frame::Frame) -> Result<(), String> {
        let sender = self
            .outbound
            .as_ref()
            .ok_or_else(|| "Client already closed".to_string())?;
        sender
            .send(frame)
            .await
            .map_err(|_| "Channel closed: session ended".to_string())
    }

    /// Next frame from the relay; `None` once the session has ended.
    pub async fn recv(&mut self) -> Option<server_stream_frame::Frame> {
        self.inbound.recv().await
    }

    /// A frame that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<server_stream_frame::Frame> {
        self.inbound.try_recv().ok()
    }

    /// Drop the client half without sending `Close`.
    pub fn disconnect(&mut self) {
        self.outbound = None;
    }

    /// Stop accepting frames from the relay while keeping the connection.
    pub fn stop_reading(&mut self) {
        self.inbound.close();
    }
}
