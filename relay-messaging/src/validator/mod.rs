//! Validator pipeline
//!
//! Every client-originated request is checked here before anything is
//! written. The outer request signature is verified first, then the
//! message kind selects its own rules. The first failing rule decides the
//! rejection reason.

mod bill;
mod login;

use std::sync::Arc;

use relay_core::config::MessagingConfig;
use relay_core::models::{MessageId, PaymentRequestRecord, PublicKey, RendezvousKey};
use relay_core::service::{AccountResolver, DomainVerifier, SignatureVerifier};
use relay_core::{Error, Result};
use relay_proto::messaging::{message::Kind, AckMessagesRequest, SendMessageRequest, Signature};

/// A send request that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedMessage {
    pub rendezvous_key: RendezvousKey,
    pub kind: Kind,
    /// The outer request signature, kept on the stored message
    pub request_signature: Signature,
    /// Written alongside the message for accepted `RequestToReceiveBill`s
    pub payment_request: Option<PaymentRequestRecord>,
}

/// A signed acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAck {
    pub rendezvous_key: RendezvousKey,
    pub message_ids: Vec<MessageId>,
}

pub struct MessageValidator {
    accounts: Arc<dyn AccountResolver>,
    domains: Arc<dyn DomainVerifier>,
    signatures: Arc<dyn SignatureVerifier>,
    config: MessagingConfig,
}

impl MessageValidator {
    pub fn new(
        accounts: Arc<dyn AccountResolver>,
        domains: Arc<dyn DomainVerifier>,
        signatures: Arc<dyn SignatureVerifier>,
        config: MessagingConfig,
    ) -> Self {
        Self {
            accounts,
            domains,
            signatures,
            config,
        }
    }

    /// Validate a `SendMessage` request.
    pub async fn validate_send(&self, request: &SendMessageRequest) -> Result<ValidatedMessage> {
        let rendezvous_key = PublicKey::from_rendezvous(request.rendezvous_key.as_ref())?;
        let request_signature = self.verify_request_signature(
            &rendezvous_key,
            &request.signing_payload(),
            request.signature.as_ref(),
        )?;

        let kind = request
            .message
            .as_ref()
            .and_then(|message| message.kind.clone())
            .ok_or_else(|| Error::invalid("message kind is required"))?;

        let payment_request = match &kind {
            Kind::RequestToGrabBill(grab) => {
                self.validate_grab_bill(grab).await?;
                None
            }
            Kind::RequestToReceiveBill(receive) => {
                Some(self.validate_receive_bill(&rendezvous_key, receive).await?)
            }
            Kind::RequestToLogin(login) => {
                self.validate_request_to_login(&rendezvous_key, login).await?;
                None
            }
            Kind::LoginAttempt(attempt) => {
                self.validate_login_attempt(&rendezvous_key, attempt).await?;
                None
            }
            Kind::CodeScanned(_) => {
                return Err(Error::invalid("message kind cannot be sent by clients"));
            }
        };

        Ok(ValidatedMessage {
            rendezvous_key,
            kind,
            request_signature,
            payment_request,
        })
    }

    /// Validate an `AckMessages` request, signed by the rendezvous key.
    pub fn validate_ack(&self, request: &AckMessagesRequest) -> Result<ValidatedAck> {
        let rendezvous_key = PublicKey::from_rendezvous(request.rendezvous_key.as_ref())?;
        self.verify_request_signature(
            &rendezvous_key,
            &request.signing_payload(),
            request.signature.as_ref(),
        )?;

        let message_ids = request
            .message_ids
            .iter()
            .map(MessageId::from_proto)
            .collect::<Result<Vec<_>>>()?;

        Ok(ValidatedAck {
            rendezvous_key,
            message_ids,
        })
    }

    fn verify_request_signature(
        &self,
        rendezvous_key: &RendezvousKey,
        payload: &[u8],
        signature: Option<&Signature>,
    ) -> Result<Signature> {
        let signature = signature
            .ok_or_else(|| Error::Unauthenticated("request signature is required".to_string()))?;
        if !self.signatures.verify(rendezvous_key, payload, &signature.value) {
            return Err(Error::Unauthenticated("invalid request signature".to_string()));
        }
        Ok(signature.clone())
    }

    /// Check a signature embedded in a message payload.
    fn verify_payload_signature(
        &self,
        signer: &PublicKey,
        payload: &[u8],
        signature: Option<&Signature>,
        what: &str,
    ) -> Result<()> {
        let signature = signature.ok_or_else(|| Error::invalid(format!("{what} signature is required")))?;
        if self.signatures.verify(signer, payload, &signature.value) {
            Ok(())
        } else {
            Err(Error::Unauthenticated(format!("invalid {what} signature")))
        }
    }

    /// The rendezvous key echoed inside a payload must name this channel.
    fn check_rendezvous_echo(
        rendezvous_key: &RendezvousKey,
        echoed: Option<&relay_proto::messaging::RendezvousKey>,
    ) -> Result<()> {
        let echoed = PublicKey::from_rendezvous(echoed)?;
        if echoed == *rendezvous_key {
            Ok(())
        } else {
            Err(Error::invalid("rendezvous key mismatch"))
        }
    }

    /// Fail with `PermissionDenied` unless `owner` owns `domain`.
    async fn check_domain_ownership(&self, owner: &PublicKey, domain: &str) -> Result<()> {
        let base_domain = relay_core::validation::ascii_base_domain(domain);
        if self.domains.verify_ownership(owner, domain).await? {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!(
                "{owner} does not own domain {base_domain}"
            )))
        }
    }
}
