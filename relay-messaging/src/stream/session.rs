//! Stream session
//!
//! Drives one duplex connection from open to its terminal state. All state
//! changes of a session happen on the task that calls [`StreamSession::run`],
//! so pings, acks and closes on the same connection are serialized.

use std::collections::HashSet;
use std::sync::Arc;

use relay_core::config::MessagingConfig;
use relay_core::models::{MessageId, MessageRecord, RendezvousKey};
use relay_core::repository::{MessageStore, PresenceStore};
use relay_core::Result;
use relay_proto::messaging::{
    client_stream_frame, server_stream_frame, AckMessagesRequest, MessageBatch, Ping,
};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::hub::StreamHub;
use super::registry::{SessionInfo, SessionRegistry};
use super::state::{EndReason, SessionOutcome, SessionState};
use super::transport::StreamTransport;
use super::SessionId;
use crate::poller::DeliveryPoller;
use crate::validator::MessageValidator;

/// Timer settings for stream sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub ping_delay: Duration,
    pub keep_alive_recv_timeout: Duration,
    pub record_max_age: Duration,
    pub poll_interval: Duration,
}

impl From<&MessagingConfig> for SessionSettings {
    fn from(config: &MessagingConfig) -> Self {
        // Zero periods would make tokio intervals panic
        let floor = Duration::from_millis(1);
        Self {
            ping_delay: config.ping_delay().max(floor),
            keep_alive_recv_timeout: config.keep_alive_recv_timeout(),
            record_max_age: config.record_max_age(),
            poll_interval: config.poll_interval().max(floor),
        }
    }
}

/// Everything a session shares with the rest of the process
#[derive(Clone)]
pub struct SessionContext {
    pub messages: Arc<dyn MessageStore>,
    pub presence: Arc<dyn PresenceStore>,
    pub validator: Arc<MessageValidator>,
    pub hub: StreamHub,
    pub registry: SessionRegistry,
    pub settings: SessionSettings,
    /// Cancelled when the relay shuts down
    pub shutdown: CancellationToken,
}

pub struct StreamSession {
    ctx: SessionContext,
    id: SessionId,
    rendezvous_key: RendezvousKey,
    keep_alive: bool,
    state: SessionState,
    last_ping_received_at: Option<Instant>,
    /// Delivered on this connection and not yet acked through it
    pending_acks: HashSet<MessageId>,
    delivered: usize,
}

impl StreamSession {
    #[must_use]
    pub fn new(
        ctx: SessionContext,
        id: SessionId,
        rendezvous_key: RendezvousKey,
        keep_alive: bool,
    ) -> Self {
        Self {
            ctx,
            id,
            rendezvous_key,
            keep_alive,
            state: SessionState::Init,
            last_ping_received_at: None,
            pending_acks: HashSet::new(),
            delivered: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid session transition {} -> {}",
            self.state,
            next
        );
        debug!(
            session_id = %self.id,
            rendezvous_key = %self.rendezvous_key,
            from = %self.state,
            to = %next,
            "Session state changed"
        );
        self.state = next;
    }

    /// Run the session until it reaches a terminal state.
    ///
    /// Fails only when the presence record cannot be written on open; every
    /// later failure ends the session and is reported in the outcome.
    pub async fn run<T>(mut self, transport: &mut T) -> Result<SessionOutcome>
    where
        T: StreamTransport + ?Sized,
    {
        let opened_at = Instant::now();
        let key = self.rendezvous_key;

        let saved = {
            let _key_guard = self.ctx.registry.lock_key(&key).await;
            self.ctx.registry.register(SessionInfo {
                session_id: self.id.clone(),
                rendezvous_key: key,
                keep_alive: self.keep_alive,
                opened_at,
            });
            let saved = self.ctx.presence.save(&key).await;
            if saved.is_err() {
                self.ctx.registry.unregister(&self.id);
            }
            saved
        };
        if let Err(e) = saved {
            error!(
                session_id = %self.id,
                rendezvous_key = %key,
                error = %e,
                "Failed to save presence record, refusing stream"
            );
            self.transition(SessionState::Failed);
            return Err(e);
        }
        self.transition(SessionState::Open);

        let wake = self.ctx.hub.subscribe(key, self.id.clone());
        let poller_cancel = self.ctx.shutdown.child_token();
        let (batch_tx, mut batch_rx) = mpsc::channel(4);
        let poller = DeliveryPoller::new(
            Arc::clone(&self.ctx.messages),
            key,
            self.ctx.settings.poll_interval,
        )
        .spawn(wake, poller_cancel.clone(), batch_tx);
        self.transition(SessionState::Active);

        info!(
            session_id = %self.id,
            rendezvous_key = %key,
            keep_alive = self.keep_alive,
            "Message stream opened"
        );

        let reason = self.serve(transport, opened_at, &mut batch_rx).await;

        // Stop the poller before anything else so nothing is delivered late
        poller_cancel.cancel();
        drop(batch_rx);
        if let Err(e) = poller.await {
            warn!(session_id = %self.id, error = %e, "Delivery poller task failed");
        }
        self.ctx.hub.unsubscribe(&key, &self.id);

        {
            let _key_guard = self.ctx.registry.lock_key(&key).await;
            if self.ctx.registry.unregister(&self.id) == 0 {
                if let Err(e) = self.ctx.presence.delete(&key).await {
                    warn!(
                        session_id = %self.id,
                        rendezvous_key = %key,
                        error = %e,
                        "Failed to delete presence record"
                    );
                }
            }
        }

        self.transition(reason.terminal_state());
        let lifetime = opened_at.elapsed();
        info!(
            session_id = %self.id,
            rendezvous_key = %key,
            state = %self.state,
            reason = %reason,
            delivered = self.delivered,
            unacked = self.pending_acks.len(),
            last_ping_ms_ago = self
                .last_ping_received_at
                .map(|at| at.elapsed().as_millis() as u64),
            lifetime_ms = lifetime.as_millis() as u64,
            "Message stream ended"
        );

        Ok(SessionOutcome {
            session_id: self.id.clone(),
            state: self.state,
            reason,
            delivered: self.delivered,
            lifetime,
        })
    }

    async fn serve<T>(
        &mut self,
        transport: &mut T,
        opened_at: Instant,
        batches: &mut mpsc::Receiver<Vec<MessageRecord>>,
    ) -> EndReason
    where
        T: StreamTransport + ?Sized,
    {
        let settings = self.ctx.settings;
        let shutdown = self.ctx.shutdown.clone();

        let max_age = tokio::time::sleep_until(opened_at + settings.record_max_age);
        tokio::pin!(max_age);
        let keep_alive_deadline = tokio::time::sleep(settings.keep_alive_recv_timeout);
        tokio::pin!(keep_alive_deadline);
        let mut pings =
            tokio::time::interval_at(Instant::now() + settings.ping_delay, settings.ping_delay);

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => return EndReason::Shutdown,

                () = &mut max_age => return EndReason::MaxAgeReached,

                () = &mut keep_alive_deadline, if self.keep_alive => {
                    return EndReason::KeepAliveTimeout;
                }

                frame = transport.recv() => match frame {
                    Some(Ok(frame)) => {
                        if let Some(reason) =
                            self.handle_frame(frame, keep_alive_deadline.as_mut()).await
                        {
                            return reason;
                        }
                    }
                    Some(Err(e)) => return EndReason::Transport(e),
                    None => return EndReason::Disconnected,
                },

                Some(batch) = batches.recv() => {
                    if let Err(e) = self.deliver(transport, batch) {
                        return EndReason::Transport(e);
                    }
                }

                _ = pings.tick(), if self.keep_alive => {
                    let ping = server_stream_frame::Frame::Ping(Ping {
                        timestamp: Some(now_timestamp()),
                    });
                    if let Err(e) = transport.send(ping) {
                        return EndReason::Transport(e);
                    }
                }
            }
        }
    }

    async fn handle_frame(
        &mut self,
        frame: client_stream_frame::Frame,
        keep_alive_deadline: std::pin::Pin<&mut Sleep>,
    ) -> Option<EndReason> {
        match frame {
            client_stream_frame::Frame::Ping(_) => {
                let now = Instant::now();
                self.last_ping_received_at = Some(now);
                keep_alive_deadline.reset(now + self.ctx.settings.keep_alive_recv_timeout);
                if let Err(e) = self.ctx.presence.refresh(&self.rendezvous_key).await {
                    warn!(
                        session_id = %self.id,
                        rendezvous_key = %self.rendezvous_key,
                        error = %e,
                        "Failed to refresh presence record"
                    );
                }
                None
            }
            client_stream_frame::Frame::Ack(request) => {
                self.handle_ack(&request).await;
                None
            }
            client_stream_frame::Frame::Close(_) => Some(EndReason::ClientClosed),
            client_stream_frame::Frame::Open(_) => {
                warn!(session_id = %self.id, "Ignoring open frame on an open stream");
                None
            }
        }
    }

    /// Acks on a stream are best-effort: a bad ack is logged and the
    /// stream stays open.
    async fn handle_ack(&mut self, request: &AckMessagesRequest) {
        let ack = match self.ctx.validator.validate_ack(request) {
            Ok(ack) => ack,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Rejected ack on stream");
                return;
            }
        };
        if ack.rendezvous_key != self.rendezvous_key {
            warn!(
                session_id = %self.id,
                rendezvous_key = %ack.rendezvous_key,
                "Rejected ack for another rendezvous key"
            );
            return;
        }

        for id in &ack.message_ids {
            match self.ctx.messages.delete(&self.rendezvous_key, id).await {
                Ok(()) => {
                    self.pending_acks.remove(id);
                }
                Err(e) => {
                    error!(
                        session_id = %self.id,
                        message_id = %id,
                        error = %e,
                        "Failed to delete acked message"
                    );
                }
            }
        }
        debug!(
            session_id = %self.id,
            acked = ack.message_ids.len(),
            pending = self.pending_acks.len(),
            "Messages acked on stream"
        );
    }

    fn deliver<T>(&mut self, transport: &T, batch: Vec<MessageRecord>) -> std::result::Result<(), String>
    where
        T: StreamTransport + ?Sized,
    {
        let mut messages = Vec::with_capacity(batch.len());
        for record in batch {
            debug!(
                session_id = %self.id,
                message_id = %record.id,
                kind = record.kind_name(),
                "Delivering message"
            );
            self.pending_acks.insert(record.id);
            messages.push(record.message);
        }

        let count = messages.len();
        transport.send(server_stream_frame::Frame::Messages(MessageBatch { messages }))?;
        self.delivered += count;
        Ok(())
    }
}

fn now_timestamp() -> prost_types::Timestamp {
    let now = chrono::Utc::now();
    prost_types::Timestamp {
        seconds: now.timestamp(),
        nanos: now.timestamp_subsec_nanos() as i32,
    }
}
