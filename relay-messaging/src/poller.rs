//! Delivery poller
//!
//! One poller runs per open stream. It re-reads the message store on a fixed
//! interval and forwards records the session has not seen yet. A message
//! sent through another relay process only ever reaches a stream through
//! this loop; the local hub merely wakes the poller early.

use std::collections::HashSet;
use std::sync::Arc;

use relay_core::models::{MessageId, MessageRecord, RendezvousKey};
use relay_core::repository::MessageStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub struct DeliveryPoller {
    store: Arc<dyn MessageStore>,
    rendezvous_key: RendezvousKey,
    interval: Duration,
    /// Ids already handed to the session
    delivered: HashSet<MessageId>,
}

impl DeliveryPoller {
    pub fn new(store: Arc<dyn MessageStore>, rendezvous_key: RendezvousKey, interval: Duration) -> Self {
        Self {
            store,
            rendezvous_key,
            interval,
            delivered: HashSet::new(),
        }
    }

    /// Run the poller on its own task until `cancel` fires or the session
    /// drops its receiver.
    ///
    /// The first pass runs immediately, so messages already resident in the
    /// store are delivered before any new ones.
    pub fn spawn(
        self,
        wake: mpsc::Receiver<()>,
        cancel: CancellationToken,
        out: mpsc::Sender<Vec<MessageRecord>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = self.run(wake, out) => {}
            }
        })
    }

    async fn run(mut self, mut wake: mpsc::Receiver<()>, out: mpsc::Sender<Vec<MessageRecord>>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                Some(()) = wake.recv() => {}
            }

            let batch = match self.poll_once().await {
                Ok(batch) => batch,
                Err(e) => {
                    // The next tick retries
                    error!(rendezvous_key = %self.rendezvous_key, error = %e, "Failed to poll message store");
                    continue;
                }
            };

            if batch.is_empty() {
                continue;
            }
            debug!(
                rendezvous_key = %self.rendezvous_key,
                count = batch.len(),
                "Poller found new messages"
            );
            if out.send(batch).await.is_err() {
                break;
            }
        }
    }

    /// Read the channel and return unseen records in insertion order.
    pub async fn poll_once(&mut self) -> relay_core::Result<Vec<MessageRecord>> {
        let records = self.store.list(&self.rendezvous_key).await?;

        // Forget ids that were acked, so the set stays bounded by the channel
        let present: HashSet<MessageId> = records.iter().map(|record| record.id).collect();
        self.delivered.retain(|id| present.contains(id));

        let fresh: Vec<MessageRecord> = records
            .into_iter()
            .filter(|record| !self.delivered.contains(&record.id))
            .collect();
        self.delivered.extend(fresh.iter().map(|record| record.id));
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::repository::MemoryMessageStore;
    use relay_core::PublicKey;
    use relay_proto::messaging::{message::Kind, CodeScanned};

    fn record(key: RendezvousKey) -> MessageRecord {
        MessageRecord::new(key, Kind::CodeScanned(CodeScanned::default()), None)
    }

    #[tokio::test]
    async fn test_poll_once_returns_only_unseen_records() {
        let store = MemoryMessageStore::new();
        let key = PublicKey::from_bytes([7; 32]);
        let first = record(key);
        let second = record(key);
        store.insert(&first).await.unwrap();

        let mut poller = DeliveryPoller::new(Arc::new(store.clone()), key, Duration::from_millis(10));
        let batch = poller.poll_once().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, first.id);

        store.insert(&second).await.unwrap();
        let batch = poller.poll_once().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, second.id);

        assert!(poller.poll_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_acked_ids_are_forgotten() {
        let store = MemoryMessageStore::new();
        let key = PublicKey::from_bytes([7; 32]);
        let first = record(key);
        store.insert(&first).await.unwrap();

        let mut poller = DeliveryPoller::new(Arc::new(store.clone()), key, Duration::from_millis(10));
        assert_eq!(poller.poll_once().await.unwrap().len(), 1);

        store.delete(&key, &first.id).await.unwrap();
        assert!(poller.poll_once().await.unwrap().is_empty());
        assert!(poller.delivered.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_poller_delivers_and_stops_on_cancel() {
        let store = MemoryMessageStore::new();
        let key = PublicKey::from_bytes([7; 32]);
        let resident = record(key);
        store.insert(&resident).await.unwrap();

        let (wake_tx, wake_rx) = mpsc::channel(1);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let handle = DeliveryPoller::new(Arc::new(store.clone()), key, Duration::from_secs(60))
            .spawn(wake_rx, cancel.clone(), out_tx);

        let batch = out_rx.recv().await.unwrap();
        assert_eq!(batch[0].id, resident.id);

        // A wake-up is picked up long before the next tick
        let sent = record(key);
        store.insert(&sent).await.unwrap();
        wake_tx.send(()).await.unwrap();
        let batch = out_rx.recv().await.unwrap();
        assert_eq!(batch[0].id, sent.id);

        cancel.cancel();
        handle.await.unwrap();
        assert!(out_rx.recv().await.is_none());
    }
}
