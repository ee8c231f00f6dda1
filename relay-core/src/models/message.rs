use prost::Message as _;
use relay_proto::messaging::{message::Kind, Message, Signature};

use super::key::{MessageId, RendezvousKey};
use crate::error::{Error, Result};

/// A message admitted to a rendezvous channel.
///
/// The stored form is the encoded protobuf `Message`, which always carries
/// the relay-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub rendezvous_key: RendezvousKey,
    pub id: MessageId,
    pub message: Message,
}

impl MessageRecord {
    /// Build a new record with a fresh id.
    ///
    /// `request_signature` is the sender's `SendMessage` signature, absent
    /// for relay-generated messages.
    #[must_use]
    pub fn new(
        rendezvous_key: RendezvousKey,
        kind: Kind,
        request_signature: Option<Signature>,
    ) -> Self {
        let id = MessageId::new();
        let message = Message {
            id: Some(id.to_proto()),
            send_message_request_signature: request_signature,
            kind: Some(kind),
        };
        Self {
            rendezvous_key,
            id,
            message,
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        self.message.encode_to_vec()
    }

    pub fn decode(rendezvous_key: RendezvousKey, bytes: &[u8]) -> Result<Self> {
        let message = Message::decode(bytes)?;
        let id = message
            .id
            .as_ref()
            .ok_or_else(|| Error::Internal("stored message has no id".to_string()))
            .and_then(MessageId::from_proto)?;
        Ok(Self {
            rendezvous_key,
            id,
            message,
        })
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.message.kind_name()
    }
}
