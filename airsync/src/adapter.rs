//! Per-entity synchronization callbacks.
//!
//! A [`SyncAdapter`] plugs one entity type into the coordinator: how to read
//! and save its cached records, how to fetch fresh values, and when a cached
//! record is too old. The coordinator owns the control flow; adapters only
//! answer questions.
//!
//! Most entities use [`EntityAdapter`](crate::entity::EntityAdapter), which
//! composes a [`RecordStore`](crate::store::RecordStore) and a
//! [`RemoteSource`](crate::remote::RemoteSource).

use std::time::Duration;

use tokio::sync::watch;

use crate::error::{ErrorClass, RemoteError, StoreError};
use crate::key::FetchKey;
use crate::record::CachedRecord;
use crate::staleness;
use crate::store::BoxFuture;

/// Callbacks the coordinator needs for one entity type.
///
/// # Dyn Compatibility
///
/// Async methods return [`BoxFuture`] so adapters can be held as trait
/// objects.
pub trait SyncAdapter: Send + Sync + 'static {
    /// Key identifying one record.
    type Key: FetchKey;

    /// Value stored in each record.
    type Value: Clone + Send + Sync + 'static;

    /// Entity name for logs.
    fn name(&self) -> &str;

    /// How long a cached record stays fresh.
    fn max_age(&self) -> Duration;

    /// Read the cached record for `key`.
    fn read<'a>(
        &'a self,
        key: &'a Self::Key,
    ) -> BoxFuture<'a, Result<Option<CachedRecord<Self::Value>>, StoreError>>;

    /// Fetch a fresh value from the remote source. Called once per attempt.
    fn fetch<'a>(&'a self, key: &'a Self::Key) -> BoxFuture<'a, Result<Self::Value, RemoteError>>;

    /// Store a freshly fetched value. Idempotent upsert.
    fn save<'a>(
        &'a self,
        key: &'a Self::Key,
        value: Self::Value,
        fetched_at_millis: i64,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Decide whether `cached` should be refreshed at `now_millis`.
    ///
    /// Defaults to the staleness check against [`max_age`](Self::max_age).
    fn should_fetch(&self, cached: Option<&CachedRecord<Self::Value>>, now_millis: i64) -> bool {
        staleness::is_stale(cached, self.max_age(), now_millis)
    }

    /// Classify a remote failure as retryable or not.
    fn classify(&self, error: &RemoteError) -> ErrorClass {
        error.class()
    }

    /// Every key with a cached record.
    fn keys(&self) -> BoxFuture<'_, Result<Vec<Self::Key>, StoreError>>;

    /// Delete records fetched before `cutoff_millis`. Returns how many were removed.
    fn delete_older_than(&self, cutoff_millis: i64) -> BoxFuture<'_, Result<usize, StoreError>>;

    /// Delete every cached record.
    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Change notifications for `key`.
    ///
    /// Returns `None` if the adapter cannot report changes; subscriptions
    /// then run once and stay idle.
    fn changes(&self, _key: &Self::Key) -> Option<watch::Receiver<u64>> {
        None
    }
}
