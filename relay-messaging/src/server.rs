//! Relay server request handlers
//!
//! `RelayServer` is the transport-independent boundary of the relay. HTTP and
//! WebSocket handlers in `relay-api` decode requests and call into it.

use std::sync::Arc;

use relay_core::config::MessagingConfig;
use relay_core::models::{MessageId, MessageRecord, PublicKey, RendezvousKey};
use relay_core::repository::{MessageStore, PaymentRequestStore, PresenceStore};
use relay_core::service::{AccountResolver, DomainVerifier, SignatureVerifier};
use relay_core::{Error, Result};
use relay_proto::messaging::{
    message::Kind, AckMessagesRequest, Message, OpenMessageStreamRequest, PollMessagesRequest,
    SendMessageRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::stream::{
    SessionContext, SessionOutcome, SessionRegistry, SessionSettings, StreamHub, StreamSession,
    StreamTransport,
};
use crate::validator::MessageValidator;

/// Durable stores shared by every relay process
#[derive(Clone)]
pub struct Stores {
    pub messages: Arc<dyn MessageStore>,
    pub presence: Arc<dyn PresenceStore>,
    pub payment_requests: Arc<dyn PaymentRequestStore>,
}

/// Services consulted by the validator pipeline
#[derive(Clone)]
pub struct Collaborators {
    pub accounts: Arc<dyn AccountResolver>,
    pub domains: Arc<dyn DomainVerifier>,
    pub signatures: Arc<dyn SignatureVerifier>,
}

#[derive(Clone)]
pub struct RelayServer {
    inner: Arc<RelayServerInner>,
}

struct RelayServerInner {
    node_id: String,
    config: MessagingConfig,
    stores: Stores,
    validator: Arc<MessageValidator>,
    sessions: SessionContext,
}

impl RelayServer {
    pub fn new(
        node_id: impl Into<String>,
        config: MessagingConfig,
        stores: Stores,
        collaborators: Collaborators,
    ) -> Self {
        let validator = Arc::new(MessageValidator::new(
            collaborators.accounts,
            collaborators.domains,
            collaborators.signatures,
            config.clone(),
        ));
        let sessions = SessionContext {
            messages: Arc::clone(&stores.messages),
            presence: Arc::clone(&stores.presence),
            validator: Arc::clone(&validator),
            hub: StreamHub::new(),
            registry: SessionRegistry::new(),
            settings: SessionSettings::from(&config),
            shutdown: CancellationToken::new(),
        };

        Self {
            inner: Arc::new(RelayServerInner {
                node_id: node_id.into(),
                config,
                stores,
                validator,
                sessions,
            }),
        }
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.inner.node_id
    }

    #[must_use]
    pub fn config(&self) -> &MessagingConfig {
        &self.inner.config
    }

    /// Validate and store a client message, returning its id.
    ///
    /// Nothing is written when validation fails.
    pub async fn send_message(&self, request: &SendMessageRequest) -> Result<MessageId> {
        let validated = match self.inner.validator.validate_send(request).await {
            Ok(validated) => validated,
            Err(e) => {
                debug!(error = %e, "Rejected message");
                return Err(e);
            }
        };
        let key = validated.rendezvous_key;

        if self.inner.config.require_active_stream && !self.inner.stores.presence.exists(&key).await? {
            return Err(Error::NoActiveStream(key.to_string()));
        }

        if let Some(payment_request) = &validated.payment_request {
            self.inner.stores.payment_requests.save(payment_request).await?;
        }

        let record = MessageRecord::new(key, validated.kind, Some(validated.request_signature));
        self.store_and_notify(record).await
    }

    /// Store a relay-generated message without client authentication.
    ///
    /// Not reachable from any external route.
    pub async fn internally_create_message(&self, key: &RendezvousKey, kind: Kind) -> Result<MessageId> {
        self.store_and_notify(MessageRecord::new(*key, kind, None)).await
    }

    async fn store_and_notify(&self, record: MessageRecord) -> Result<MessageId> {
        let id = self.inner.stores.messages.insert(&record).await?;
        let woken = self.inner.sessions.hub.notify(&record.rendezvous_key);
        info!(
            rendezvous_key = %record.rendezvous_key,
            message_id = %id,
            kind = record.kind_name(),
            local_streams = woken,
            "Message stored"
        );
        Ok(id)
    }

    /// Serve a message stream on `transport` until it ends.
    ///
    /// Fails before any frame is exchanged if the key is malformed or the
    /// presence record cannot be written.
    pub async fn open_message_stream<T>(
        &self,
        request: &OpenMessageStreamRequest,
        transport: &mut T,
    ) -> Result<SessionOutcome>
    where
        T: StreamTransport + ?Sized,
    {
        let key = PublicKey::from_rendezvous(request.rendezvous_key.as_ref())?;
        let session_id = nanoid::nanoid!(12);
        StreamSession::new(self.inner.sessions.clone(), session_id, key, request.keep_alive)
            .run(transport)
            .await
    }

    /// Delete acknowledged messages. Unknown ids are ignored.
    pub async fn ack_messages(&self, request: &AckMessagesRequest) -> Result<()> {
        let ack = self.inner.validator.validate_ack(request)?;
        for id in &ack.message_ids {
            self.inner.stores.messages.delete(&ack.rendezvous_key, id).await?;
        }
        debug!(
            rendezvous_key = %ack.rendezvous_key,
            count = ack.message_ids.len(),
            "Messages acked"
        );
        Ok(())
    }

    /// Every unacked message on the key, oldest first.
    pub async fn poll_for_messages(&self, request: &PollMessagesRequest) -> Result<Vec<Message>> {
        let key = PublicKey::from_rendezvous(request.rendezvous_key.as_ref())?;
        let records = self.inner.stores.messages.list(&key).await?;
        Ok(records.into_iter().map(|record| record.message).collect())
    }

    /// Streams open on this process
    #[must_use]
    pub fn local_session_count(&self) -> usize {
        self.inner.sessions.registry.count()
    }

    #[must_use]
    pub fn local_sessions_for(&self, key: &RendezvousKey) -> usize {
        self.inner.sessions.registry.count_for_key(key)
    }

    /// End every open stream on this process.
    pub fn shutdown(&self) {
        info!(
            node_id = %self.inner.node_id,
            sessions = self.local_session_count(),
            "Closing message streams"
        );
        self.inner.sessions.shutdown.cancel();
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.sessions.shutdown.is_cancelled()
    }
}
