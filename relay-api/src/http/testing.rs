// Router fixtures for handler tests

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header, Request, StatusCode},
    Router,
};
use ed25519_dalek::{Signer as _, SigningKey};
use prost::Message;
use relay_core::config::MessagingConfig;
use relay_core::models::PublicKey;
use relay_core::repository::{MemoryMessageStore, MemoryPaymentRequestStore, MemoryPresenceStore};
use relay_core::service::{Ed25519Verifier, MemoryAccountResolver, MemoryDomainVerifier};
use relay_messaging::{Collaborators, RelayServer, Stores};
use relay_proto::messaging::Signature;
use tower::ServiceExt;

use super::{create_router, AppState};

pub struct Signer {
    key: SigningKey,
}

impl Signer {
    pub fn new() -> Self {
        Self {
            key: SigningKey::from_bytes(&rand::random::<[u8; 32]>()),
        }
    }

    pub fn public(&self) -> PublicKey {
        PublicKey::from_bytes(self.key.verifying_key().to_bytes())
    }

    pub fn sign(&self, payload: &[u8]) -> Signature {
        Signature {
            value: self.key.sign(payload).to_bytes().to_vec(),
        }
    }
}

pub struct TestDeps {
    pub accounts: MemoryAccountResolver,
    pub relay: RelayServer,
}

pub fn router() -> (Router, TestDeps) {
    let config = MessagingConfig::default();
    let accounts = MemoryAccountResolver::new();
    let relay = RelayServer::new(
        "relay-test",
        config.clone(),
        Stores {
            messages: Arc::new(MemoryMessageStore::new()),
            presence: Arc::new(MemoryPresenceStore::new(config.record_max_age())),
            payment_requests: Arc::new(MemoryPaymentRequestStore::new()),
        },
        Collaborators {
            accounts: Arc::new(accounts.clone()),
            domains: Arc::new(MemoryDomainVerifier::new()),
            signatures: Arc::new(Ed25519Verifier),
        },
    );
    let app = create_router(AppState::new(relay.clone(), config.max_frame_size));
    (app, TestDeps { accounts, relay })
}

pub async fn post_proto<M: Message>(app: &Router, path: &str, body: &M) -> (StatusCode, Bytes) {
    post_bytes(app, path, body.encode_to_vec()).await
}

pub async fn post_bytes(app: &Router, path: &str, body: Vec<u8>) -> (StatusCode, Bytes) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, super::messages::PROTOBUF_CONTENT_TYPE)
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body)
}
