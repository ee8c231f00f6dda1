use std::sync::Arc;

use dashmap::DashMap;
use relay_core::RendezvousKey;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::SessionId;

#[derive(Debug, Clone)]
struct Subscriber {
    session_id: SessionId,
    wake: mpsc::Sender<()>,
}

/// Local fast path for same-process delivery
///
/// Sessions subscribe to their rendezvous key; a send on this process wakes
/// their pollers immediately instead of waiting for the next poll tick. The
/// hub only carries wake-ups, never messages, so the store stays the single
/// source of ordering.
#[derive(Clone, Default)]
pub struct StreamHub {
    keys: Arc<DashMap<RendezvousKey, Vec<Subscriber>>>,
}

impl StreamHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return its wake-up receiver.
    pub fn subscribe(&self, key: RendezvousKey, session_id: SessionId) -> mpsc::Receiver<()> {
        // Capacity 1: pending wake-ups coalesce
        let (wake, rx) = mpsc::channel(1);
        self.keys
            .entry(key)
            .or_default()
            .push(Subscriber { session_id, wake });
        rx
    }

    pub fn unsubscribe(&self, key: &RendezvousKey, session_id: &str) {
        if let Some(mut subscribers) = self.keys.get_mut(key) {
            subscribers.retain(|sub| sub.session_id != session_id);
            if subscribers.is_empty() {
                drop(subscribers);
                self.keys.remove_if(key, |_, subs| subs.is_empty());
            }
        }
    }

    /// Wake every local session on `key`. Returns how many were woken.
    pub fn notify(&self, key: &RendezvousKey) -> usize {
        let mut woken = 0;
        let mut closed = Vec::new();

        if let Some(subscribers) = self.keys.get(key) {
            for subscriber in subscribers.iter() {
                match subscriber.wake.try_send(()) {
                    // A full channel already holds a pending wake-up
                    Ok(()) | Err(mpsc::error::TrySendError::Full(())) => woken += 1,
                    Err(mpsc::error::TrySendError::Closed(())) => {
                        warn!(
                            rendezvous_key = %key,
                            session_id = %subscriber.session_id,
                            "Session wake channel closed, marking for cleanup"
                        );
                        closed.push(subscriber.session_id.clone());
                    }
                }
            }
        }

        for session_id in closed {
            self.unsubscribe(key, &session_id);
        }

        debug!(rendezvous_key = %key, woken, "Notified local sessions");
        woken
    }

    #[must_use]
    pub fn subscriber_count(&self, key: &RendezvousKey) -> usize {
        self.keys.get(key).map_or(0, |subs| subs.len())
    }
}
