//! Shared fixtures for coordinator integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use airsync::clock::ManualClock;
use airsync::connectivity::{ConnectivityMonitor, SharedConnectivity};
use airsync::coordinator::{CoordinatorConfig, SyncCoordinator};
use airsync::entity::EntityAdapter;
use airsync::remote::RemoteSource;
use airsync::retry::RetryPolicy;
use airsync::store::{BoxFuture, MemoryStore, RecordStore};
use airsync::{CachedRecord, LocationKey, RemoteError, StoreError};

/// Fixed "now" for tests using a manual clock.
pub const NOW: i64 = 1_700_000_000_000;

/// Freshness window used by [`Harness`].
pub const MAX_AGE: Duration = Duration::from_secs(30 * 60);

pub type TestAdapter = EntityAdapter<LocationKey, String>;

pub fn key(name: &str) -> LocationKey {
    LocationKey::new(name).unwrap()
}

pub fn fresh(value: &str) -> CachedRecord<String> {
    CachedRecord::new(value.to_string(), NOW - 60_000)
}

pub fn stale(value: &str) -> CachedRecord<String> {
    CachedRecord::new(value.to_string(), NOW - 2 * 60 * 60 * 1000)
}

// ============================================================================
// Scripted remote source
// ============================================================================

/// Remote source that replays scripted results in order.
///
/// Once the script runs out, every call returns `fallback`.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<String, RemoteError>>>,
    fallback: Result<String, RemoteError>,
    per_key: HashMap<LocationKey, RemoteError>,
    calls: AtomicU32,
    latency: Duration,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<String, RemoteError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Err(RemoteError::transient("script exhausted")),
            per_key: HashMap::new(),
            calls: AtomicU32::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Always return `value`.
    pub fn always(value: &str) -> Self {
        Self::new(Vec::new()).with_fallback(Ok(value.to_string()))
    }

    /// Always fail with `error`.
    pub fn failing(error: RemoteError) -> Self {
        Self::new(Vec::new()).with_fallback(Err(error))
    }

    pub fn with_fallback(mut self, fallback: Result<String, RemoteError>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Always fail fetches of `key` with `error`, regardless of the script.
    pub fn with_failing_key(mut self, key: LocationKey, error: RemoteError) -> Self {
        self.per_key.insert(key, error);
        self
    }

    /// Sleep this long inside every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteSource<LocationKey, String> for ScriptedSource {
    fn fetch<'a>(&'a self, key: &'a LocationKey) -> BoxFuture<'a, Result<String, RemoteError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if let Some(error) = self.per_key.get(key) {
                return Err(error.clone());
            }
            let next = self.script.lock().pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Store with injectable faults
// ============================================================================

/// In-memory store whose reads and writes can be made to fail.
pub struct FaultyStore {
    inner: MemoryStore<LocationKey, String>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &MemoryStore<LocationKey, String> {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Backend(format!("injected {op} fault")))
        } else {
            Ok(())
        }
    }
}

impl RecordStore<LocationKey, String> for FaultyStore {
    fn read<'a>(
        &'a self,
        key: &'a LocationKey,
    ) -> BoxFuture<'a, Result<Option<CachedRecord<String>>, StoreError>> {
        Box::pin(async move {
            self.check(&self.fail_reads, "read")?;
            self.inner.read(key).await
        })
    }

    fn upsert(
        &self,
        key: LocationKey,
        record: CachedRecord<String>,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.check(&self.fail_writes, "write")?;
            self.inner.upsert(key, record).await
        })
    }

    fn keys(&self) -> BoxFuture<'_, Result<Vec<LocationKey>, StoreError>> {
        Box::pin(async move {
            self.check(&self.fail_reads, "read")?;
            self.inner.keys().await
        })
    }

    fn latest(
        &self,
    ) -> BoxFuture<'_, Result<Option<(LocationKey, CachedRecord<String>)>, StoreError>> {
        self.inner.latest()
    }

    fn delete_older_than(&self, cutoff_millis: i64) -> BoxFuture<'_, Result<usize, StoreError>> {
        Box::pin(async move {
            self.check(&self.fail_writes, "write")?;
            self.inner.delete_older_than(cutoff_millis).await
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.check(&self.fail_writes, "write")?;
            self.inner.clear().await
        })
    }

    fn subscribe(&self, key: &LocationKey) -> watch::Receiver<u64> {
        self.inner.subscribe(key)
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A coordinator wired to a faulty store, a scripted source, switchable
/// connectivity and a manual clock.
pub struct Harness {
    pub store: Arc<FaultyStore>,
    pub source: Arc<ScriptedSource>,
    pub connectivity: SharedConnectivity,
    pub clock: Arc<ManualClock>,
    pub coordinator: SyncCoordinator<TestAdapter>,
}

impl Harness {
    /// Retry policy: 3 attempts, 1s then 2s backoff.
    pub fn new(source: ScriptedSource) -> Self {
        Self::with_policy(
            source,
            RetryPolicy::ExponentialBackoff {
                max_attempts: 3,
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(30),
                multiplier: 2.0,
            },
        )
    }

    pub fn with_policy(source: ScriptedSource, retry: RetryPolicy) -> Self {
        let store = Arc::new(FaultyStore::new());
        let source = Arc::new(source);
        let connectivity = SharedConnectivity::online();
        let clock = Arc::new(ManualClock::new(NOW));

        let adapter = EntityAdapter::new(
            "test",
            MAX_AGE,
            store.clone() as Arc<dyn RecordStore<LocationKey, String>>,
            source.clone() as Arc<dyn RemoteSource<LocationKey, String>>,
        );
        let coordinator = SyncCoordinator::with_config(
            adapter,
            Arc::new(connectivity.clone()) as Arc<dyn ConnectivityMonitor>,
            clock.clone(),
            CoordinatorConfig::default().with_retry(retry),
        );

        Self {
            store,
            source,
            connectivity,
            clock,
            coordinator,
        }
    }

    /// Seed a record directly into the backing store.
    pub fn seed(&self, key: &LocationKey, record: CachedRecord<String>) {
        self.store.inner().put(key.clone(), record);
    }

    pub fn cached(&self, key: &LocationKey) -> Option<CachedRecord<String>> {
        self.store.inner().get(key)
    }
}
