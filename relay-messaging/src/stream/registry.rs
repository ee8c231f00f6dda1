use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use relay_core::RendezvousKey;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use super::SessionId;

/// Local view of one open session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub rendezvous_key: RendezvousKey,
    pub keep_alive: bool,
    pub opened_at: Instant,
}

impl SessionInfo {
    #[must_use]
    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }
}

/// Exclusive hold on one rendezvous key's presence within this process.
///
/// The lock entry is dropped from the registry once nobody else waits on it.
pub struct KeyGuard {
    key: RendezvousKey,
    locks: Arc<DashMap<RendezvousKey, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Sessions open on this process
///
/// Keeps a per-key count so the last local session on a key knows to
/// remove the presence record. Registering plus the presence write, and
/// unregistering plus the presence delete, both run under [`KeyGuard`] so a
/// late delete cannot remove the record of a session that opened meanwhile.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, SessionInfo>>,
    per_key: Arc<DashMap<RendezvousKey, usize>>,
    key_locks: Arc<DashMap<RendezvousKey, Arc<Mutex<()>>>>,
    total_opened: Arc<AtomicU64>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `key`'s presence record.
    pub async fn lock_key(&self, key: &RendezvousKey) -> KeyGuard {
        let lock = Arc::clone(self.key_locks.entry(*key).or_default().value());
        KeyGuard {
            key: *key,
            locks: Arc::clone(&self.key_locks),
            guard: Some(lock.lock_owned().await),
        }
    }

    pub fn register(&self, info: SessionInfo) {
        *self.per_key.entry(info.rendezvous_key).or_insert(0) += 1;
        self.total_opened.fetch_add(1, Ordering::Relaxed);
        debug!(
            session_id = %info.session_id,
            rendezvous_key = %info.rendezvous_key,
            "Session registered"
        );
        self.sessions.insert(info.session_id.clone(), info);
    }

    /// Remove a session. Returns how many local sessions remain on its key.
    pub fn unregister(&self, session_id: &str) -> usize {
        let Some((_, info)) = self.sessions.remove(session_id) else {
            warn!(session_id = %session_id, "Attempted to unregister unknown session");
            return 0;
        };

        let remaining = match self.per_key.get_mut(&info.rendezvous_key) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            self.per_key
                .remove_if(&info.rendezvous_key, |_, count| *count == 0);
        }
        remaining
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn count_for_key(&self, key: &RendezvousKey) -> usize {
        self.per_key.get(key).map_or(0, |count| *count)
    }

    #[must_use]
    pub fn total_opened(&self) -> u64 {
        self.total_opened.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<SessionInfo> {
        self.sessions.get(session_id).map(|info| info.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::PublicKey;

    fn info(id: &str, key: RendezvousKey) -> SessionInfo {
        SessionInfo {
            session_id: id.to_string(),
            rendezvous_key: key,
            keep_alive: false,
            opened_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn test_refcount_per_key() {
        let registry = SessionRegistry::new();
        let key = PublicKey::from_bytes([1; 32]);
        let other = PublicKey::from_bytes([2; 32]);

        registry.register(info("a", key));
        registry.register(info("b", key));
        registry.register(info("c", other));
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.count_for_key(&key), 2);

        assert_eq!(registry.unregister("a"), 1);
        assert_eq!(registry.unregister("b"), 0);
        assert_eq!(registry.count_for_key(&key), 0);
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.total_opened(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_lock_serializes_holders() {
        let registry = SessionRegistry::new();
        let key = PublicKey::from_bytes([3; 32]);
        let other = PublicKey::from_bytes([4; 32]);

        let guard = registry.lock_key(&key).await;
        // Other keys are not blocked
        drop(registry.lock_key(&other).await);

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _guard = registry.lock_key(&key).await;
                registry.register(info("late", key));
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());
        assert_eq!(registry.count_for_key(&key), 0);

        drop(guard);
        waiter.await.unwrap();
        assert_eq!(registry.count_for_key(&key), 1);
        assert!(registry.key_locks.is_empty());
    }

    #[tokio::test]
    async fn test_unregister_unknown_session() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.unregister("missing"), 0);
        assert!(registry.get("missing").is_none());
    }
}
