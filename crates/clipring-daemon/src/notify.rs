//! Push delivery of history snapshots to subscribers.

use clipring_common::ClipEntry;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Full history, newest first, shared between subscribers.
///
/// Entries are shared with the history store, so publishing never copies
/// entry contents.
pub type Snapshot = Arc<Vec<Arc<ClipEntry>>>;

/// Snapshots a subscriber may have outstanding before it is dropped.
pub const SUBSCRIBER_QUEUE: usize = 64;

/// Identifies one subscription for unsubscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving end of a subscription.
///
/// Every published snapshot is delivered in publish order; nothing is
/// coalesced. Dropping the receiver ends the subscription at the next
/// publish. A subscriber that falls [`SUBSCRIBER_QUEUE`] snapshots behind
/// is dropped, and its receiver yields `None` once drained.
pub struct Subscription {
    pub id: SubscriptionId,
    pub updates: mpsc::Receiver<Snapshot>,
}

#[derive(Default)]
pub struct Notifier {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, mpsc::Sender<Snapshot>)>,
}

impl Notifier {
    pub fn subscribe(&mut self) -> Subscription {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let (tx, updates) = mpsc::channel(SUBSCRIBER_QUEUE);
        self.subscribers.push((id, tx));
        Subscription { id, updates }
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn publish(&mut self, snapshot: Snapshot) {
        self.subscribers
            .retain(|(id, tx)| match tx.try_send(Arc::clone(&snapshot)) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!("Dropping subscription {:?}: it stopped reading", id);
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Dropping closed subscription {:?}", id);
                    false
                }
            });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipring_common::ClipPayload;

    fn snapshot(ids: &[u64]) -> Snapshot {
        Arc::new(
            ids.iter()
                .map(|&id| {
                    Arc::new(ClipEntry {
                        id,
                        payload: ClipPayload::Text(id.to_string()),
                        created_at: 0,
                    })
                })
                .collect(),
        )
    }

    #[test]
    fn test_every_publish_is_delivered_in_order() {
        let mut notifier = Notifier::default();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        notifier.publish(snapshot(&[1]));
        notifier.publish(snapshot(&[2, 1]));

        for sub in [&mut first, &mut second] {
            assert_eq!(sub.updates.try_recv().unwrap().len(), 1);
            assert_eq!(sub.updates.try_recv().unwrap()[0].id, 2);
            assert!(sub.updates.try_recv().is_err());
        }
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut notifier = Notifier::default();
        let mut sub = notifier.subscribe();

        assert!(notifier.unsubscribe(sub.id));
        assert!(!notifier.unsubscribe(sub.id));

        notifier.publish(snapshot(&[1]));
        assert!(sub.updates.try_recv().is_err());
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let mut notifier = Notifier::default();
        let sub = notifier.subscribe();
        let _kept = notifier.subscribe();
        drop(sub);

        notifier.publish(snapshot(&[]));
        assert_eq!(notifier.subscriber_count(), 1);
    }

    #[test]
    fn test_subscriber_that_stops_reading_is_dropped() {
        let mut notifier = Notifier::default();
        let mut stalled = notifier.subscribe();
        let mut live = notifier.subscribe();

        for id in 0..SUBSCRIBER_QUEUE as u64 {
            notifier.publish(snapshot(&[id]));
            assert_eq!(live.updates.try_recv().unwrap()[0].id, id);
        }
        assert_eq!(notifier.subscriber_count(), 2);

        notifier.publish(snapshot(&[99]));
        assert_eq!(notifier.subscriber_count(), 1);
        assert_eq!(live.updates.try_recv().unwrap()[0].id, 99);

        // The stalled subscriber keeps what was queued, then sees the end.
        let mut queued = 0;
        while let Ok(update) = stalled.updates.try_recv() {
            assert_eq!(update[0].id, queued);
            queued += 1;
        }
        assert_eq!(queued, SUBSCRIBER_QUEUE as u64);
        assert!(matches!(
            stalled.updates.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
