//! WebSocket message streams with binary proto frames
//!
//! The socket is adapted to `StreamTransport`; the session lifecycle
//! itself lives in `relay_messaging`. The first client frame must be an
//! `Open` frame naming the rendezvous key.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use relay_messaging::{FrameCodec, StreamTransport};
use relay_proto::messaging::{client_stream_frame, server_stream_frame};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::http::AppState;

/// Outbound frames a client may fall behind by before its stream fails
const OUTBOUND_BUFFER: usize = 256;

pub fn create_websocket_router() -> Router<AppState> {
    Router::new().route("/v1/stream", get(websocket_handler))
}

/// WebSocket adapter for `StreamTransport`
struct WebSocketTransport {
    receiver: SplitStream<WebSocket>,
    sender: mpsc::Sender<Message>,
    is_alive: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl StreamTransport for WebSocketTransport {
    async fn recv(&mut self) -> Option<Result<client_stream_frame::Frame, String>> {
        loop {
            match self.receiver.next().await {
                Some(Ok(Message::Binary(bytes))) => {
                    return Some(FrameCodec::decode_client_frame(&bytes));
                }
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Err(e)) => return Some(Err(format!("WebSocket error: {e}"))),
                Some(Ok(_)) => {
                    // Text, ping and pong frames are not part of the protocol
                }
            }
        }
    }

    fn send(&self, frame: server_stream_frame::Frame) -> Result<(), String> {
        if !self.is_alive.load(Ordering::Relaxed) {
            return Err("WebSocket sender closed".to_string());
        }
        let bytes = FrameCodec::encode_server_frame(frame);
        self.sender
            .try_send(Message::Binary(bytes.into()))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    "Channel full: WebSocket client too slow to consume frames".to_string()
                }
                mpsc::error::TrySendError::Closed(_) => {
                    "Channel closed: WebSocket client disconnected".to_string()
                }
            })
    }
}

impl WebSocketTransport {
    /// Queue a close frame. Delivered after any frames already queued.
    async fn close(&self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code,
            reason: truncate_reason(reason).into(),
        };
        let _ = self.sender.send(Message::Close(Some(frame))).await;
    }
}

/// Close reasons are limited to 123 bytes on the wire.
fn truncate_reason(reason: &str) -> String {
    const MAX_REASON: usize = 123;
    if reason.len() <= MAX_REASON {
        return reason.to_string();
    }
    let mut end = MAX_REASON;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    reason[..end].to_string()
}

/// Upgrade to a message stream.
pub async fn websocket_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.max_message_size(state.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, receiver) = socket.split();
    let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
    let is_alive = Arc::new(AtomicBool::new(true));
    let writer = tokio::spawn(write_frames(sink, rx, Arc::clone(&is_alive)));

    let mut transport = WebSocketTransport {
        receiver,
        sender: tx,
        is_alive,
    };

    let request = match transport.recv().await {
        Some(Ok(client_stream_frame::Frame::Open(request))) => request,
        Some(Ok(_)) => {
            warn!("WebSocket stream did not start with an open frame");
            transport
                .close(close_code::POLICY, "first frame must open the stream")
                .await;
            finish(transport, writer).await;
            return;
        }
        Some(Err(e)) => {
            warn!("Failed to read open frame: {}", e);
            transport.close(close_code::PROTOCOL, "malformed frame").await;
            finish(transport, writer).await;
            return;
        }
        None => {
            finish(transport, writer).await;
            return;
        }
    };

    match state.relay.open_message_stream(&request, &mut transport).await {
        Ok(outcome) => {
            info!(
                session_id = %outcome.session_id,
                state = %outcome.state,
                reason = %outcome.reason,
                "WebSocket stream finished"
            );
            transport.close(close_code::NORMAL, &outcome.reason.to_string()).await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to open message stream");
            let code = if e.is_retryable() {
                close_code::AGAIN
            } else {
                close_code::POLICY
            };
            transport.close(code, &e.reason()).await;
        }
    }

    finish(transport, writer).await;
}

/// Drop the transport so the writer drains its queue and exits.
async fn finish(transport: WebSocketTransport, writer: tokio::task::JoinHandle<()>) {
    drop(transport);
    if let Err(e) = writer.await {
        error!("WebSocket writer task failed: {}", e);
    }
}

async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Message>,
    is_alive: Arc<AtomicBool>,
) {
    while let Some(message) = rx.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            error!("Failed to send WebSocket message: {}", e);
            is_alive.store(false, Ordering::Relaxed);
            break;
        }
        if closing {
            break;
        }
    }
}
