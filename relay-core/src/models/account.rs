use serde::{Deserialize, Serialize};

use super::key::PublicKey;

/// Account classification as derived by the account service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Primary,
    TemporaryIncoming,
    TemporaryOutgoing,
    Bucket,
    RemoteSendGiftCard,
    Relationship,
    Swap,
}

impl AccountType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "PRIMARY",
            Self::TemporaryIncoming => "TEMPORARY_INCOMING",
            Self::TemporaryOutgoing => "TEMPORARY_OUTGOING",
            Self::Bucket => "BUCKET",
            Self::RemoteSendGiftCard => "REMOTE_SEND_GIFT_CARD",
            Self::Relationship => "RELATIONSHIP",
            Self::Swap => "SWAP",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved view of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account: PublicKey,
    pub account_type: AccountType,
    /// Owner key the account was derived from
    pub owner: PublicKey,
    /// Derivation index among the owner's accounts of the same type
    #[serde(default)]
    pub index: u64,
    /// Whether this is the owner's highest-index account of its type
    #[serde(default)]
    pub is_latest: bool,
    /// Domain a RELATIONSHIP account was created for
    #[serde(default)]
    pub relationship_domain: Option<String>,
}

impl AccountInfo {
    #[must_use]
    pub const fn new(account: PublicKey, account_type: AccountType, owner: PublicKey) -> Self {
        Self {
            account,
            account_type,
            owner,
            index: 0,
            is_latest: true,
            relationship_domain: None,
        }
    }

    #[must_use]
    pub const fn with_index(mut self, index: u64, is_latest: bool) -> Self {
        self.index = index;
        self.is_latest = is_latest;
        self
    }

    #[must_use]
    pub fn with_relationship(mut self, domain: impl Into<String>) -> Self {
        self.relationship_domain = Some(domain.into());
        self
    }
}
