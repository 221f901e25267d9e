//! Per-key write serialization.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

/// One async mutex per key, created on demand.
///
/// Entries are pruned when the last holder or waiter lets go of them, so the
/// map only grows with keys that are actively being fetched.
pub(crate) struct KeyLocks<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyLocks<K> {
    pub(crate) fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Returns `None` if `cancel` fires first.
    pub(crate) async fn lock(&self, key: &K, cancel: &CancellationToken) -> Option<KeyGuard<'_, K>> {
        // Declared first so it drops after the pending lock future.
        let mut waiting = Waiting {
            locks: self,
            key,
            armed: true,
        };
        let mutex = Arc::clone(self.locks.entry(key.clone()).or_default().value());

        let guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            guard = mutex.lock_owned() => guard,
        };

        waiting.armed = false;
        Some(KeyGuard {
            guard: Some(guard),
            locks: self,
            key: key.clone(),
        })
    }

    /// Number of keys with a live lock entry.
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }

    fn prune(&self, key: &K) {
        self.locks.remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Prunes the key's entry if a wait ends without acquiring the lock.
struct Waiting<'a, K: Eq + Hash + Clone> {
    locks: &'a KeyLocks<K>,
    key: &'a K,
    armed: bool,
}

impl<K: Eq + Hash + Clone> Drop for Waiting<'_, K> {
    fn drop(&mut self) {
        if self.armed {
            self.locks.prune(self.key);
        }
    }
}

/// Exclusive access to one key. Released on drop.
pub(crate) struct KeyGuard<'a, K: Eq + Hash + Clone> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a KeyLocks<K>,
    key: K,
}

impl<K: Eq + Hash + Clone> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        // Release before pruning so the strong count reflects only waiters.
        drop(self.guard.take());
        self.locks.prune(&self.key);
    }
}
