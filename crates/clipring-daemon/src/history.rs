//! Bounded, newest-first clipboard history.

use clipring_common::{ClipEntry, ClipPayload};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::notify::{Notifier, Snapshot, Subscription, SubscriptionId};

/// Default history capacity.
pub const MAX_HISTORY: usize = 300;

/// Most recently observed clipboard value of each kind, for dedup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastSeen {
    /// Trimmed text.
    pub text: Option<String>,
    /// Signature of the last image (see `RgbaImage::signature`).
    pub image_signature: Option<String>,
}

/// The single source of truth for clipboard history.
///
/// Every mutation publishes the resulting snapshot to subscribers.
pub struct HistoryStore {
    entries: VecDeque<Arc<ClipEntry>>,
    capacity: usize,
    next_id: u64,
    last_seen: LastSeen,
    notifier: Notifier,
}

impl HistoryStore {
    /// Create an empty store. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
            last_seen: LastSeen::default(),
            notifier: Notifier::default(),
        }
    }

    /// Record a new entry at the front, evicting the oldest beyond capacity.
    pub fn insert(&mut self, payload: ClipPayload) -> ClipEntry {
        let entry = Arc::new(ClipEntry {
            id: self.next_id,
            payload,
            created_at: now_millis(),
        });
        self.next_id += 1;

        self.entries.push_front(Arc::clone(&entry));
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }

        self.publish();
        ClipEntry::clone(&entry)
    }

    /// Empty the history and forget the last seen clipboard values.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_seen = LastSeen::default();
        self.publish();
    }

    /// Current history, newest first.
    pub fn snapshot(&self) -> Vec<ClipEntry> {
        self.query(None, None)
    }

    /// Entries matching `search`, newest first, at most `limit` of them.
    ///
    /// See [`ClipEntry::matches`] for how `search` is applied.
    pub fn query(&self, search: Option<&str>, limit: Option<usize>) -> Vec<ClipEntry> {
        self.entries
            .iter()
            .filter(|entry| search.map_or(true, |search| entry.matches(search)))
            .take(limit.unwrap_or(usize::MAX))
            .map(|entry| ClipEntry::clone(entry))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last_seen(&self) -> &LastSeen {
        &self.last_seen
    }

    pub fn last_seen_mut(&mut self) -> &mut LastSeen {
        &mut self.last_seen
    }

    pub fn subscribe(&mut self) -> Subscription {
        self.notifier.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }

    fn publish(&mut self) {
        if self.notifier.subscriber_count() == 0 {
            return;
        }
        let snapshot: Snapshot = Arc::new(self.entries.iter().cloned().collect());
        self.notifier.publish(snapshot);
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
