use std::fmt;
use std::str::FromStr;

use relay_proto::messaging as proto;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Length of an ed25519 public key
pub const PUBLIC_KEY_LEN: usize = 32;

/// An ed25519 public key, displayed as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

/// Public key identifying one rendezvous channel.
pub type RendezvousKey = PublicKey;

impl PublicKey {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| {
            Error::invalid(format!(
                "public key must be {PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    #[must_use]
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Parse the `rendezvous_key` field of a request or payload.
    pub fn from_rendezvous(key: Option<&proto::RendezvousKey>) -> Result<Self> {
        let key = key.ok_or_else(|| Error::invalid("rendezvous key is required"))?;
        Self::from_slice(&key.value)
            .map_err(|_| Error::invalid("rendezvous key is invalid"))
    }

    /// Parse an account id field, naming the field in the rejection.
    pub fn from_account(account: Option<&proto::AccountId>, field: &str) -> Result<Self> {
        let account = account.ok_or_else(|| Error::invalid(format!("{field} is required")))?;
        Self::from_slice(&account.value).map_err(|_| Error::invalid(format!("{field} is invalid")))
    }

    #[must_use]
    pub fn to_rendezvous(&self) -> proto::RendezvousKey {
        proto::RendezvousKey {
            value: self.0.to_vec(),
        }
    }

    #[must_use]
    pub fn to_account(&self) -> proto::AccountId {
        proto::AccountId {
            value: self.0.to_vec(),
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base58())
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| Error::invalid(format!("invalid base58 public key: {e}")))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Relay-assigned message identifier (UUIDv4, 16 bytes on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Uuid::from_slice(bytes)
            .map(Self)
            .map_err(|_| Error::invalid("message id is invalid"))
    }

    pub fn from_proto(id: &proto::MessageId) -> Result<Self> {
        Self::from_slice(&id.value)
    }

    #[must_use]
    pub fn to_proto(&self) -> proto::MessageId {
        proto::MessageId {
            value: self.0.as_bytes().to_vec(),
        }
    }

    /// Compact form used inside store keys
    #[must_use]
    pub fn to_simple(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| Error::invalid("message id is invalid"))
    }
}
