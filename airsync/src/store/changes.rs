//! Per-key change notification.

use std::hash::Hash;

use dashmap::DashMap;
use tokio::sync::watch;

/// Revision counters per key, delivered through `watch` channels.
///
/// Senders are created lazily on first subscription and dropped once no
/// receiver remains.
#[derive(Debug)]
pub struct ChangeFeed<K: Eq + Hash> {
    senders: DashMap<K, watch::Sender<u64>>,
}

impl<K: Eq + Hash + Clone> ChangeFeed<K> {
    pub fn new() -> Self {
        Self {
            senders: DashMap::new(),
        }
    }

    /// Subscribe to revisions of `key`.
    pub fn subscribe(&self, key: &K) -> watch::Receiver<u64> {
        self.senders
            .entry(key.clone())
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    /// Bump the revision of `key`.
    pub fn notify(&self, key: &K) {
        if let Some(tx) = self.senders.get(key) {
            tx.send_modify(|rev| *rev = rev.wrapping_add(1));
        }
        self.senders.remove_if(key, |_, tx| tx.receiver_count() == 0);
    }

    /// Bump the revision of every subscribed key.
    pub fn notify_all(&self) {
        for entry in self.senders.iter() {
            entry.value().send_modify(|rev| *rev = rev.wrapping_add(1));
        }
        self.senders.retain(|_, tx| tx.receiver_count() > 0);
    }

    /// Number of keys with live subscribers.
    pub fn subscribed_keys(&self) -> usize {
        self.senders.len()
    }
}

impl<K: Eq + Hash + Clone> Default for ChangeFeed<K> {
    fn default() -> Self {
        Self::new()
    }
}
