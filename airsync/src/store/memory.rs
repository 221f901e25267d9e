//! In-memory record store.
//!
//! Records are held as `Arc<CachedRecord<T>>` behind a `parking_lot::RwLock`.
//! A write swaps the `Arc` while holding the write lock; a read clones the
//! `Arc` under the read lock and copies the value out afterwards. Readers
//! therefore see either the previous record or the new one, never a mix.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::error::StoreError;
use crate::key::FetchKey;
use crate::record::CachedRecord;
use crate::store::changes::ChangeFeed;
use crate::store::traits::{BoxFuture, RecordStore};

/// Default proximity window for nearby lookups (±0.1°).
pub const DEFAULT_PROXIMITY_DEG: f64 = 0.1;

/// In-memory entity table.
pub struct MemoryStore<K: FetchKey, T> {
    records: RwLock<HashMap<K, Arc<CachedRecord<T>>>>,
    changes: ChangeFeed<K>,
}

impl<K: FetchKey, T: Clone> MemoryStore<K, T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            changes: ChangeFeed::new(),
        }
    }

    /// Create a store pre-populated with records. No notifications are sent.
    pub fn with_records(records: impl IntoIterator<Item = (K, CachedRecord<T>)>) -> Self {
        let map = records
            .into_iter()
            .map(|(k, r)| (k, Arc::new(r)))
            .collect();
        Self {
            records: RwLock::new(map),
            changes: ChangeFeed::new(),
        }
    }

    /// Read a record.
    pub fn get(&self, key: &K) -> Option<CachedRecord<T>> {
        let record = self.records.read().get(key).cloned();
        record.map(|r| (*r).clone())
    }

    /// Insert or replace a record and notify subscribers.
    pub fn put(&self, key: K, record: CachedRecord<T>) {
        self.records.write().insert(key.clone(), Arc::new(record));
        self.changes.notify(&key);
    }

    /// Remove records fetched before `cutoff_millis`. Returns the removed keys.
    pub fn remove_older_than(&self, cutoff_millis: i64) -> Vec<K> {
        let removed: Vec<K> = {
            let mut records = self.records.write();
            let stale: Vec<K> = records
                .iter()
                .filter(|(_, r)| r.fetched_at_millis < cutoff_millis)
                .map(|(k, _)| k.clone())
                .collect();
            for key in &stale {
                records.remove(key);
            }
            stale
        };
        for key in &removed {
            self.changes.notify(key);
        }
        removed
    }

    /// Remove every record and notify all subscribers.
    pub fn remove_all(&self) {
        self.records.write().clear();
        self.changes.notify_all();
    }

    /// Copy of every record.
    pub fn snapshot(&self) -> Vec<(K, CachedRecord<T>)> {
        let records: Vec<(K, Arc<CachedRecord<T>>)> = self
            .records
            .read()
            .iter()
            .map(|(k, r)| (k.clone(), Arc::clone(r)))
            .collect();
        records
            .into_iter()
            .map(|(k, r)| (k, (*r).clone()))
            .collect()
    }

    /// The most recently fetched record.
    pub fn newest(&self) -> Option<(K, CachedRecord<T>)> {
        let newest = self
            .records
            .read()
            .iter()
            .max_by_key(|(_, r)| r.fetched_at_millis)
            .map(|(k, r)| (k.clone(), Arc::clone(r)));
        newest.map(|(k, r)| (k, (*r).clone()))
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Subscribe to changes of `key`.
    pub fn watch(&self, key: &K) -> watch::Receiver<u64> {
        self.changes.subscribe(key)
    }

    /// Every stored key. Record values are not copied.
    pub fn key_list(&self) -> Vec<K> {
        self.records.read().keys().cloned().collect()
    }

    /// Find the newest record within ±`tolerance_deg` of `key`.
    ///
    /// An exact match is not required; the newest record inside the
    /// bounding box wins.
    pub fn nearest(&self, key: &K, tolerance_deg: f64) -> Option<(K, CachedRecord<T>)> {
        let found = self
            .records
            .read()
            .iter()
            .filter(|(k, _)| key.is_within(k, tolerance_deg))
            .max_by_key(|(_, r)| r.fetched_at_millis)
            .map(|(k, r)| (k.clone(), Arc::clone(r)));
        found.map(|(k, r)| (k, (*r).clone()))
    }
}

impl<K: FetchKey, T: Clone> Default for MemoryStore<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> RecordStore<K, T> for MemoryStore<K, T>
where
    K: FetchKey,
    T: Clone + Send + Sync + 'static,
{
    fn read<'a>(&'a self, key: &'a K) -> BoxFuture<'a, Result<Option<CachedRecord<T>>, StoreError>> {
        Box::pin(async move { Ok(self.get(key)) })
    }

    fn read_near<'a>(
        &'a self,
        key: &'a K,
        tolerance_deg: f64,
    ) -> BoxFuture<'a, Result<Option<CachedRecord<T>>, StoreError>> {
        Box::pin(async move { Ok(self.nearest(key, tolerance_deg).map(|(_, r)| r)) })
    }

    fn upsert(&self, key: K, record: CachedRecord<T>) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.put(key, record);
            Ok(())
        })
    }

    fn keys(&self) -> BoxFuture<'_, Result<Vec<K>, StoreError>> {
        Box::pin(async move { Ok(self.key_list()) })
    }

    fn latest(&self) -> BoxFuture<'_, Result<Option<(K, CachedRecord<T>)>, StoreError>> {
        Box::pin(async move { Ok(self.newest()) })
    }

    fn delete_older_than(&self, cutoff_millis: i64) -> BoxFuture<'_, Result<usize, StoreError>> {
        Box::pin(async move { Ok(self.remove_older_than(cutoff_millis).len()) })
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.remove_all();
            Ok(())
        })
    }

    fn subscribe(&self, key: &K) -> watch::Receiver<u64> {
        self.watch(key)
    }
}
