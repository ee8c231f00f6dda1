use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::RendezvousKey;

/// Advisory marker that a subscriber stream is open for a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub rendezvous_key: RendezvousKey,
    pub created_at: DateTime<Utc>,
    pub last_refreshed_at: DateTime<Utc>,
}

impl PresenceRecord {
    #[must_use]
    pub fn new(rendezvous_key: RendezvousKey) -> Self {
        let now = Utc::now();
        Self {
            rendezvous_key,
            created_at: now,
            last_refreshed_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_refreshed_at = Utc::now();
    }
}
