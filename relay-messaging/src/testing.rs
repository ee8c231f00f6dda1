//! Test harness: two relays over shared in-memory stores, plus request
//! builders that sign the way real clients do.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ed25519_dalek::{Signer, SigningKey};
use relay_core::config::MessagingConfig;
use relay_core::models::{AccountInfo, AccountType, MessageId, PresenceRecord, PublicKey, RendezvousKey};
use relay_core::repository::{
    MemoryMessageStore, MemoryPaymentRequestStore, MemoryPresenceStore, PresenceStore,
};
use relay_core::service::{Ed25519Verifier, MemoryAccountResolver, MemoryDomainVerifier};
use relay_core::Result;
use relay_proto::messaging::request_to_receive_bill::ExchangeData;
use relay_proto::messaging::{
    message::Kind, AckMessagesRequest, Domain, ExchangeData as ExactExchangeData, LoginAttempt,
    Message, Nonce, OpenMessageStreamRequest, RequestToGrabBill, RequestToLogin,
    RequestToReceiveBill, SendMessageRequest, Signature,
};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::server::{Collaborators, RelayServer, Stores};
use crate::stream::{ChannelClient, ChannelTransport, SessionOutcome};
use crate::validator::MessageValidator;

pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    pub fn new() -> Self {
        Self {
            signing: SigningKey::from_bytes(&rand::random::<[u8; 32]>()),
        }
    }

    pub fn public(&self) -> PublicKey {
        PublicKey::from_bytes(self.signing.verifying_key().to_bytes())
    }

    pub fn sign(&self, payload: &[u8]) -> Signature {
        Signature {
            value: self.signing.sign(payload).to_bytes().to_vec(),
        }
    }
}

/// Fast timings: pings every second, keep-alive timeout 3.5s, 10s max age
pub fn test_config() -> MessagingConfig {
    MessagingConfig {
        ping_delay_ms: 1_000,
        keep_alive_recv_timeout_ms: 3_500,
        record_max_age_secs: 10,
        poll_interval_ms: 100,
        ..MessagingConfig::default()
    }
}

/// Memory presence store that counts refreshes and can stall deletes the
/// way a slow network round trip would.
#[derive(Clone)]
pub struct TrackedPresenceStore {
    inner: MemoryPresenceStore,
    refreshes: Arc<AtomicUsize>,
    delete_delay: Duration,
}

#[async_trait::async_trait]
impl PresenceStore for TrackedPresenceStore {
    async fn save(&self, key: &RendezvousKey) -> Result<PresenceRecord> {
        self.inner.save(key).await
    }

    async fn refresh(&self, key: &RendezvousKey) -> Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.inner.refresh(key).await
    }

    async fn delete(&self, key: &RendezvousKey) -> Result<()> {
        if !self.delete_delay.is_zero() {
            tokio::time::sleep(self.delete_delay).await;
        }
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &RendezvousKey) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn get(&self, key: &RendezvousKey) -> Result<Option<PresenceRecord>> {
        self.inner.get(key).await
    }
}

pub struct TestEnv {
    pub messages: MemoryMessageStore,
    pub presence: MemoryPresenceStore,
    presence_refreshes: Arc<AtomicUsize>,
    pub payment_requests: MemoryPaymentRequestStore,
    pub accounts: MemoryAccountResolver,
    pub domains: MemoryDomainVerifier,
    pub config: MessagingConfig,
    /// Two relays that share nothing but the stores
    pub server1: RelayServer,
    pub server2: RelayServer,
    validator: MessageValidator,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: MessagingConfig) -> Self {
        Self::build(config, Duration::ZERO)
    }

    /// Presence deletes take `delay` to complete.
    pub fn with_slow_presence_delete(delay: Duration) -> Self {
        Self::build(test_config(), delay)
    }

    fn build(config: MessagingConfig, delete_delay: Duration) -> Self {
        let messages = MemoryMessageStore::new();
        let presence = MemoryPresenceStore::new(config.record_max_age());
        let presence_refreshes = Arc::new(AtomicUsize::new(0));
        let tracked_presence = TrackedPresenceStore {
            inner: presence.clone(),
            refreshes: Arc::clone(&presence_refreshes),
            delete_delay,
        };
        let payment_requests = MemoryPaymentRequestStore::new();
        let accounts = MemoryAccountResolver::new();
        let domains = MemoryDomainVerifier::new();

        let stores = Stores {
            messages: Arc::new(messages.clone()),
            presence: Arc::new(tracked_presence),
            payment_requests: Arc::new(payment_requests.clone()),
        };
        let collaborators = Collaborators {
            accounts: Arc::new(accounts.clone()),
            domains: Arc::new(domains.clone()),
            signatures: Arc::new(Ed25519Verifier),
        };

        let server1 = RelayServer::new("relay-1", config.clone(), stores.clone(), collaborators.clone());
        let server2 = RelayServer::new("relay-2", config.clone(), stores, collaborators.clone());
        let validator = MessageValidator::new(
            collaborators.accounts,
            collaborators.domains,
            collaborators.signatures,
            config.clone(),
        );

        Self {
            messages,
            presence,
            presence_refreshes,
            payment_requests,
            accounts,
            domains,
            config,
            server1,
            server2,
            validator,
        }
    }

    pub fn validator(&self) -> &MessageValidator {
        &self.validator
    }

    /// Presence refreshes seen by either relay.
    pub fn presence_refreshes(&self) -> usize {
        self.presence_refreshes.load(Ordering::SeqCst)
    }

    /// Register a fresh account of `account_type` owned by `owner`.
    pub fn register_account(
        &self,
        owner: &Keypair,
        account_type: AccountType,
        index: u64,
        is_latest: bool,
    ) -> PublicKey {
        let account = Keypair::new().public();
        self.accounts.insert(
            AccountInfo::new(account, account_type, owner.public()).with_index(index, is_latest),
        );
        account
    }

    pub fn register_keypair(&self, keypair: &Keypair, owner: &Keypair, account_type: AccountType) {
        self.accounts
            .insert(AccountInfo::new(keypair.public(), account_type, owner.public()));
    }

    /// A relationship account for `domain`, able to sign login attempts.
    pub fn register_relationship(&self, owner: &Keypair, domain: &str) -> Keypair {
        let user = Keypair::new();
        self.accounts.insert(
            AccountInfo::new(user.public(), AccountType::Relationship, owner.public())
                .with_relationship(domain),
        );
        user
    }

    /// Wrap `kind` in a `SendMessageRequest` signed by the rendezvous key.
    pub fn signed_request(&self, rendezvous: &Keypair, kind: Kind) -> SendMessageRequest {
        let mut request = SendMessageRequest {
            message: Some(Message {
                kind: Some(kind),
                ..Message::default()
            }),
            rendezvous_key: Some(rendezvous.public().to_rendezvous()),
            signature: None,
        };
        request.signature = Some(rendezvous.sign(&request.signing_payload()));
        request
    }

    pub fn grab_bill_request(&self, rendezvous: &Keypair, requestor: &PublicKey) -> SendMessageRequest {
        self.signed_request(
            rendezvous,
            Kind::RequestToGrabBill(RequestToGrabBill {
                requestor_account: Some(requestor.to_account()),
            }),
        )
    }

    pub fn receive_bill_request(
        &self,
        rendezvous: &Keypair,
        requestor: &PublicKey,
        exchange_data: Option<ExchangeData>,
        domain: Option<&str>,
        verifier: Option<&Keypair>,
    ) -> SendMessageRequest {
        let payload = Self::receive_bill_payload(rendezvous, requestor, exchange_data, domain, verifier);
        self.signed_request(rendezvous, Kind::RequestToReceiveBill(payload))
    }

    /// With a verifier, the payload echoes the rendezvous key and carries
    /// the verifier's signature.
    pub fn receive_bill_payload(
        rendezvous: &Keypair,
        requestor: &PublicKey,
        exchange_data: Option<ExchangeData>,
        domain: Option<&str>,
        verifier: Option<&Keypair>,
    ) -> RequestToReceiveBill {
        let mut payload = RequestToReceiveBill {
            requestor_account: Some(requestor.to_account()),
            domain: domain.map(domain_of),
            exchange_data,
            ..RequestToReceiveBill::default()
        };
        if let Some(verifier) = verifier {
            payload.verifier = Some(verifier.public().to_account());
            payload.rendezvous_key = Some(rendezvous.public().to_rendezvous());
            payload.signature = Some(verifier.sign(&payload.signing_payload()));
        }
        payload
    }

    pub fn exact_kin(native_amount: f64) -> ExchangeData {
        Self::exact("kin", 1.0, native_amount, (native_amount * 100_000.0) as u64)
    }

    pub fn exact(currency: &str, exchange_rate: f64, native_amount: f64, quarks: u64) -> ExchangeData {
        ExchangeData::Exact(ExactExchangeData {
            currency: currency.to_string(),
            exchange_rate,
            native_amount,
            quarks,
        })
    }

    pub fn login_request_payload(rendezvous: &Keypair, verifier: &Keypair, domain: &str) -> RequestToLogin {
        let mut payload = RequestToLogin {
            domain: Some(domain_of(domain)),
            nonce: Some(random_nonce()),
            timestamp: Some(prost_types::Timestamp::default()),
            verifier: Some(verifier.public().to_account()),
            signature: None,
            rendezvous_key: Some(rendezvous.public().to_rendezvous()),
        };
        payload.signature = Some(verifier.sign(&payload.signing_payload()));
        payload
    }

    pub fn login_attempt_payload(rendezvous: &Keypair, user: &Keypair, domain: &str) -> LoginAttempt {
        let mut payload = LoginAttempt {
            user_id: Some(user.public().to_account()),
            domain: Some(domain_of(domain)),
            nonce: Some(random_nonce()),
            timestamp: Some(prost_types::Timestamp::default()),
            signature: None,
            rendezvous_key: Some(rendezvous.public().to_rendezvous()),
        };
        payload.signature = Some(user.sign(&payload.signing_payload()));
        payload
    }

    pub fn ack_request(&self, rendezvous: &Keypair, ids: &[MessageId]) -> AckMessagesRequest {
        let mut request = AckMessagesRequest {
            rendezvous_key: Some(rendezvous.public().to_rendezvous()),
            message_ids: ids.iter().map(MessageId::to_proto).collect(),
            signature: None,
        };
        request.signature = Some(rendezvous.sign(&request.signing_payload()));
        request
    }

    /// An accepted kin payment request with a primary requestor.
    pub fn valid_send(&self, rendezvous: &Keypair) -> SendMessageRequest {
        let owner = Keypair::new();
        let primary = self.register_account(&owner, AccountType::Primary, 0, true);
        self.receive_bill_request(rendezvous, &primary, Some(Self::exact_kin(5_000.0)), None, None)
    }

    /// Open a stream on `server` in a background task.
    pub fn open_stream(
        server: &RelayServer,
        rendezvous: &Keypair,
        keep_alive: bool,
    ) -> (JoinHandle<Result<SessionOutcome>>, ChannelClient) {
        let (mut transport, client) = ChannelTransport::pair(64);
        let request = OpenMessageStreamRequest {
            rendezvous_key: Some(rendezvous.public().to_rendezvous()),
            keep_alive,
        };
        let server = server.clone();
        let handle =
            tokio::spawn(async move { server.open_message_stream(&request, &mut transport).await });
        (handle, client)
    }

    /// Wait until `server` has `count` local sessions on the key.
    pub async fn wait_for_sessions(server: &RelayServer, rendezvous: &Keypair, count: usize) {
        let key = rendezvous.public();
        for _ in 0..1_000 {
            if server.local_sessions_for(&key) == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("expected {count} sessions on {key}");
    }
}

fn domain_of(domain: &str) -> Domain {
    Domain {
        value: domain.to_string(),
    }
}

fn random_nonce() -> Nonce {
    Nonce {
        value: rand::random::<[u8; 16]>().to_vec(),
    }
}
