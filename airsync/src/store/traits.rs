//! The repository interface.
//!
//! A [`RecordStore`] owns one entity table: one [`CachedRecord`] per key.
//! Writes replace records wholesale, and readers always see either the old
//! or the new record.
//!
//! # Dyn Compatibility
//!
//! Async methods return [`BoxFuture`] so stores can be shared as
//! `Arc<dyn RecordStore<K, T>>`.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::watch;

use crate::error::StoreError;
use crate::record::CachedRecord;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistent storage for one entity table.
pub trait RecordStore<K, T>: Send + Sync {
    /// Read the record stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing has been stored.
    fn read<'a>(&'a self, key: &'a K) -> BoxFuture<'a, Result<Option<CachedRecord<T>>, StoreError>>;

    /// Read the newest record whose key lies within ±`tolerance_deg` of `key`.
    ///
    /// Stores without a spatial index fall back to the exact [`read`](Self::read).
    fn read_near<'a>(
        &'a self,
        key: &'a K,
        _tolerance_deg: f64,
    ) -> BoxFuture<'a, Result<Option<CachedRecord<T>>, StoreError>> {
        self.read(key)
    }

    /// Insert or replace the record under `key`.
    ///
    /// Idempotent. Subscribers to `key` are notified after the new record is
    /// visible.
    fn upsert(&self, key: K, record: CachedRecord<T>) -> BoxFuture<'_, Result<(), StoreError>>;

    /// All keys currently stored.
    fn keys(&self) -> BoxFuture<'_, Result<Vec<K>, StoreError>>;

    /// The most recently fetched record across all keys.
    fn latest(&self) -> BoxFuture<'_, Result<Option<(K, CachedRecord<T>)>, StoreError>>;

    /// Delete records fetched strictly before `cutoff_millis`.
    ///
    /// Returns the number of records removed.
    fn delete_older_than(&self, cutoff_millis: i64) -> BoxFuture<'_, Result<usize, StoreError>>;

    /// Delete every record.
    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Subscribe to changes of `key`.
    ///
    /// The receiver's value is a revision counter bumped on every change to
    /// the key.
    fn subscribe(&self, key: &K) -> watch::Receiver<u64>;
}
