//! Integration tests for the sync coordinator.
//!
//! These tests drive a coordinator through its public API against a
//! scripted remote source, a store with injectable faults and switchable
//! connectivity. Time is paused so backoff delays are deterministic.
//!
//! Run with: `cargo test --test coordinator_integration`

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

use airsync::clock::ManualClock;
use airsync::connectivity::{ConnectivityMonitor, SharedConnectivity};
use airsync::coordinator::{CoordinatorConfig, SyncCoordinator};
use airsync::entity::EntityAdapter;
use airsync::remote::RemoteSource;
use airsync::retry::RetryPolicy;
use airsync::store::{BoxFuture, JsonFileStore, MemoryStore, RecordStore, DEFAULT_PROXIMITY_DEG};
use airsync::{CachedRecord, GeoKey, LocationKey, RemoteError, SyncErrorKind, SyncOutcome};

use common::{fresh, key, stale, Harness, ScriptedSource, NOW};

fn error_kind<T>(outcome: &SyncOutcome<T>) -> Option<SyncErrorKind> {
    outcome.sync_error().map(|e| e.kind())
}

fn value(outcome: &SyncOutcome<String>) -> Option<&str> {
    outcome.value().map(String::as_str)
}

// ============================================================================
// Single-shot reads
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_fresh_cache_skips_remote() {
    let h = Harness::new(ScriptedSource::always("remote"));
    let k = key("nairobi");
    h.seed(&k, fresh("cached"));

    let outcome = h.coordinator.get(k).await;

    assert!(outcome.is_success());
    assert_eq!(value(&outcome), Some("cached"));
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_cache_fetches_and_persists() {
    let h = Harness::new(ScriptedSource::always("remote"));
    let k = key("nairobi");

    let outcome = h.coordinator.get(k.clone()).await;

    assert!(outcome.is_success());
    assert_eq!(value(&outcome), Some("remote"));
    assert_eq!(h.source.calls(), 1);
    assert_eq!(
        h.cached(&k),
        Some(CachedRecord::new("remote".to_string(), NOW))
    );
}

#[tokio::test(start_paused = true)]
async fn test_offline_returns_cached_value() {
    let h = Harness::new(ScriptedSource::always("remote"));
    let k = key("kampala");
    h.seed(&k, stale("old"));
    h.connectivity.set(false);

    let outcome = h.coordinator.get(k.clone()).await;

    assert_eq!(error_kind(&outcome), Some(SyncErrorKind::NoConnectivity));
    assert_eq!(value(&outcome), Some("old"));
    assert_eq!(h.source.calls(), 0);
    assert_eq!(h.cached(&k), Some(stale("old")));
}

#[tokio::test(start_paused = true)]
async fn test_offline_with_empty_cache_has_no_fallback() {
    let h = Harness::new(ScriptedSource::always("remote"));
    h.connectivity.set(false);

    let outcome = h.coordinator.get(key("kigali")).await;

    assert_eq!(error_kind(&outcome), Some(SyncErrorKind::NoConnectivity));
    assert!(outcome.value().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_back_online_fetches_again() {
    let h = Harness::new(ScriptedSource::always("remote"));
    let k = key("kigali");
    h.seed(&k, stale("old"));

    h.connectivity.set(false);
    assert!(h.coordinator.get(k.clone()).await.is_error());

    h.connectivity.set(true);
    let outcome = h.coordinator.get(k).await;
    assert_eq!(value(&outcome), Some("remote"));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_exhaust_retries_and_keep_cache() {
    let h = Harness::new(ScriptedSource::failing(RemoteError::Server { status: 503 }));
    let k = key("lagos");
    h.seed(&k, stale("v1"));

    let start = Instant::now();
    let outcome = h.coordinator.get(k.clone()).await;

    assert_eq!(error_kind(&outcome), Some(SyncErrorKind::TransientRemote));
    assert_eq!(value(&outcome), Some("v1"));
    assert_eq!(h.source.calls(), 3);
    // 1s + 2s of backoff between the three attempts.
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(h.cached(&k), Some(stale("v1")));
}

#[tokio::test(start_paused = true)]
async fn test_transient_then_success() {
    let h = Harness::new(ScriptedSource::new(vec![
        Err(RemoteError::Timeout),
        Err(RemoteError::Connect("reset".into())),
        Ok("v2".to_string()),
    ]));
    let k = key("lagos");
    h.seed(&k, stale("v1"));

    let outcome = h.coordinator.get(k.clone()).await;

    assert_eq!(value(&outcome), Some("v2"));
    assert!(outcome.is_success());
    assert_eq!(h.source.calls(), 3);
    assert_eq!(h.cached(&k).map(|r| r.value), Some("v2".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_permanent_failure_is_not_retried() {
    let h = Harness::new(ScriptedSource::failing(RemoteError::Client { status: 404 }));
    let k = key("accra");
    h.seed(&k, stale("v1"));

    let start = Instant::now();
    let outcome = h.coordinator.get(k).await;

    assert_eq!(error_kind(&outcome), Some(SyncErrorKind::PermanentRemote));
    assert_eq!(value(&outcome), Some("v1"));
    assert_eq!(h.source.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_ignores_freshness() {
    let h = Harness::new(ScriptedSource::always("remote"));
    let k = key("dakar");
    h.seed(&k, fresh("cached"));

    let outcome = h.coordinator.refresh(k).await;

    assert_eq!(value(&outcome), Some("remote"));
    assert_eq!(h.source.calls(), 1);
}

// ============================================================================
// Storage faults
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_read_fault_has_no_fallback_and_skips_fetch() {
    let h = Harness::new(ScriptedSource::always("remote"));
    let k = key("abuja");
    h.seed(&k, stale("v1"));
    h.store.fail_reads(true);

    let outcome = h.coordinator.get(k).await;

    assert_eq!(error_kind(&outcome), Some(SyncErrorKind::LocalStorageFault));
    assert!(outcome.value().is_none());
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_save_fault_returns_previous_value() {
    let h = Harness::new(ScriptedSource::always("v2"));
    let k = key("abuja");
    h.seed(&k, stale("v1"));
    h.store.fail_writes(true);

    let outcome = h.coordinator.get(k.clone()).await;

    assert_eq!(error_kind(&outcome), Some(SyncErrorKind::LocalStorageFault));
    assert_eq!(value(&outcome), Some("v1"));
    assert_eq!(h.cached(&k), Some(stale("v1")));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_gets_share_one_fetch() {
    let h = Harness::new(ScriptedSource::always("v2").with_latency(Duration::from_millis(200)));
    let k = key("harare");
    h.seed(&k, stale("v1"));

    let (a, b, c) = tokio::join!(
        h.coordinator.get(k.clone()),
        h.coordinator.get(k.clone()),
        h.coordinator.get(k.clone()),
    );

    assert_eq!(h.source.calls(), 1);
    for outcome in [a, b, c] {
        assert!(outcome.is_success());
        assert_eq!(value(&outcome), Some("v2"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_different_keys_fetch_independently() {
    let h = Harness::new(ScriptedSource::always("v2").with_latency(Duration::from_millis(200)));

    let start = Instant::now();
    let (a, b) = tokio::join!(
        h.coordinator.get(key("lusaka")),
        h.coordinator.get(key("maputo")),
    );

    assert!(a.is_success() && b.is_success());
    assert_eq!(h.source.calls(), 2);
    assert!(start.elapsed() < Duration::from_millis(400));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_backoff() {
    let h = Harness::new(ScriptedSource::failing(RemoteError::Timeout));
    let k = key("luanda");
    h.seed(&k, stale("v1"));

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let outcome = h.coordinator.get_with_cancel(k.clone(), &token).await;

    assert_eq!(error_kind(&outcome), Some(SyncErrorKind::Cancelled));
    assert_eq!(value(&outcome), Some("v1"));
    // Attempt 1 at 0s, attempt 2 at 1s, cancelled during the 2s backoff.
    assert_eq!(h.source.calls(), 2);
    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(h.cached(&k), Some(stale("v1")));
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_fetch_completes_after_cancel() {
    let h = Harness::new(ScriptedSource::always("v2").with_latency(Duration::from_secs(1)));
    let k = key("luanda");
    h.seed(&k, stale("v1"));

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        canceller.cancel();
    });

    let outcome = h.coordinator.get_with_cancel(k.clone(), &token).await;

    assert_eq!(value(&outcome), Some("v2"));
    assert_eq!(h.cached(&k).map(|r| r.value), Some("v2".to_string()));
}

// ============================================================================
// Observe
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_observe_emits_interim_then_terminal() {
    let h = Harness::new(ScriptedSource::always("v2"));
    let k = key("tunis");
    h.seed(&k, stale("v1"));

    let mut stream = h.coordinator.observe(k);

    let first = stream.next().await.unwrap();
    assert!(matches!(first, SyncOutcome::StaleOrLoading(Some(ref v)) if v == "v1"));

    let second = stream.next().await.unwrap();
    assert!(second.is_success());
    assert_eq!(value(&second), Some("v2"));
}

#[tokio::test(start_paused = true)]
async fn test_observe_fresh_emits_only_success() {
    let h = Harness::new(ScriptedSource::always("v2"));
    let k = key("tunis");
    h.seed(&k, fresh("v1"));

    let mut stream = h.coordinator.observe(k);

    let first = stream.next().await.unwrap();
    assert!(first.is_success());
    assert_eq!(value(&first), Some("v1"));
    assert!(timeout(Duration::from_secs(5), stream.next()).await.is_err());
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_observe_offline_emits_interim_then_error() {
    let h = Harness::new(ScriptedSource::always("v2"));
    let k = key("cairo");
    h.seed(&k, stale("v1"));
    h.connectivity.set(false);

    let mut stream = h.coordinator.observe(k);

    let first = stream.next().await.unwrap();
    assert!(!first.is_terminal());
    assert_eq!(value(&first), Some("v1"));
    let second = stream.next().await.unwrap();
    assert_eq!(error_kind(&second), Some(SyncErrorKind::NoConnectivity));
    assert!(second.is_degraded());
}

#[tokio::test(start_paused = true)]
async fn test_observe_ignores_own_write() {
    let h = Harness::new(ScriptedSource::always("v2"));
    let k = key("rabat");
    h.seed(&k, stale("v1"));

    let mut stream = h.coordinator.observe(k);
    let _interim = stream.next().await.unwrap();
    let terminal = stream.next().await.unwrap();
    assert!(terminal.is_success());

    assert!(timeout(Duration::from_secs(5), stream.next()).await.is_err());
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_observe_reruns_on_external_change() {
    let h = Harness::new(ScriptedSource::always("v2"));
    let k = key("rabat");
    h.seed(&k, fresh("v1"));

    let mut stream = h.coordinator.observe(k.clone());
    assert_eq!(value(&stream.next().await.unwrap()), Some("v1"));

    h.store.upsert(k, fresh("v3")).await.unwrap();

    let rerun = stream.next().await.unwrap();
    assert!(rerun.is_success());
    assert_eq!(value(&rerun), Some("v3"));
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_stream_ends() {
    let h = Harness::new(ScriptedSource::always("v2"));
    let k = key("rabat");
    h.seed(&k, fresh("v1"));

    let mut stream = h.coordinator.observe(k);
    assert!(stream.next().await.is_some());

    stream.cancel();
    assert!(stream.is_cancelled());
    assert!(stream.next().await.is_none());
}

// ============================================================================
// Bulk refresh and retention
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_refresh_all_isolates_failures() {
    let bad = key("bamako");
    let source = ScriptedSource::always("new")
        .with_failing_key(bad.clone(), RemoteError::Client { status: 400 });
    let h = Harness::new(source);
    for name in ["addis ababa", "bamako", "conakry"] {
        h.seed(&key(name), fresh("old"));
    }

    let report = h.coordinator.refresh_all().await.unwrap();

    assert_eq!(report.len(), 3);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    let (worst_key, worst) = report.worst().unwrap();
    assert_eq!(worst_key, &bad);
    assert_eq!(worst.kind(), SyncErrorKind::PermanentRemote);

    assert_eq!(h.cached(&key("addis ababa")).unwrap().value, "new");
    assert_eq!(h.cached(&key("conakry")).unwrap().value, "new");
    assert_eq!(h.cached(&bad).unwrap().value, "old");
}

#[tokio::test(start_paused = true)]
async fn test_refresh_all_offline_reports_each_key() {
    let h = Harness::new(ScriptedSource::always("new"));
    h.seed(&key("dodoma"), fresh("old"));
    h.seed(&key("mombasa"), fresh("old"));
    h.connectivity.set(false);

    let report = h.coordinator.refresh_all().await.unwrap();

    assert_eq!(report.failed(), 2);
    assert!(report
        .iter()
        .all(|(_, o)| error_kind(o) == Some(SyncErrorKind::NoConnectivity)));
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_all_fails_when_keys_unreadable() {
    let h = Harness::new(ScriptedSource::always("new"));
    h.store.fail_reads(true);

    let err = h.coordinator.refresh_all().await.unwrap_err();
    assert_eq!(err.kind(), SyncErrorKind::LocalStorageFault);
}

#[tokio::test(start_paused = true)]
async fn test_purge_removes_only_old_records() {
    let h = Harness::new(ScriptedSource::always("new"));
    let day_ms = 24 * 60 * 60 * 1000;
    h.seed(&key("old"), CachedRecord::new("a".into(), NOW - 8 * day_ms));
    h.seed(&key("recent"), CachedRecord::new("b".into(), NOW - day_ms));

    let removed = h
        .coordinator
        .purge_older_than(Duration::from_secs(7 * 24 * 60 * 60))
        .await
        .unwrap();

    assert_eq!(removed, 1);
    assert!(h.cached(&key("old")).is_none());
    assert!(h.cached(&key("recent")).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_clear_empties_store() {
    let h = Harness::new(ScriptedSource::always("new"));
    h.seed(&key("a"), fresh("x"));
    h.seed(&key("b"), fresh("y"));

    h.coordinator.clear().await.unwrap();

    assert!(h.store.inner().is_empty());
}

// ============================================================================
// File-backed end to end
// ============================================================================

#[tokio::test]
async fn test_json_file_store_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("weather.json");
    let k = key("nairobi");

    {
        let store = Arc::new(JsonFileStore::<LocationKey, String>::open(&path).await.unwrap());
        let source = Arc::new(ScriptedSource::always("sunny"));
        let adapter = EntityAdapter::new(
            "weather",
            Duration::from_secs(60),
            store.clone() as Arc<dyn RecordStore<LocationKey, String>>,
            source as Arc<dyn RemoteSource<LocationKey, String>>,
        );
        let coordinator = SyncCoordinator::with_config(
            adapter,
            Arc::new(SharedConnectivity::online()) as Arc<dyn ConnectivityMonitor>,
            Arc::new(ManualClock::new(NOW)),
            CoordinatorConfig::default().with_retry(RetryPolicy::None),
        );
        assert_eq!(value(&coordinator.get(k.clone()).await), Some("sunny"));
    }

    let reopened = JsonFileStore::<LocationKey, String>::open(&path).await.unwrap();
    let record = reopened.read(&k).await.unwrap().unwrap();
    assert_eq!(record, CachedRecord::new("sunny".to_string(), NOW));

    // Offline after restart: the persisted value is still served.
    let source = Arc::new(ScriptedSource::always("rain"));
    let adapter = EntityAdapter::new(
        "weather",
        Duration::from_secs(60),
        Arc::new(reopened) as Arc<dyn RecordStore<LocationKey, String>>,
        source.clone() as Arc<dyn RemoteSource<LocationKey, String>>,
    );
    let coordinator = SyncCoordinator::with_config(
        adapter,
        Arc::new(SharedConnectivity::offline()) as Arc<dyn ConnectivityMonitor>,
        Arc::new(ManualClock::new(NOW + 10 * 60 * 1000)),
        CoordinatorConfig::default(),
    );
    let outcome = coordinator.get(k).await;
    assert_eq!(error_kind(&outcome), Some(SyncErrorKind::NoConnectivity));
    assert_eq!(value(&outcome), Some("sunny"));
    assert_eq!(source.calls(), 0);
}

// ============================================================================
// Proximity reads
// ============================================================================

struct GeoSource {
    calls: AtomicU32,
}

impl RemoteSource<GeoKey, String> for GeoSource {
    fn fetch<'a>(&'a self, _key: &'a GeoKey) -> BoxFuture<'a, Result<String, RemoteError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok("remote".to_string()) })
    }

    fn name(&self) -> &str {
        "geo"
    }
}

struct GeoHarness {
    store: Arc<MemoryStore<GeoKey, String>>,
    source: Arc<GeoSource>,
    coordinator: SyncCoordinator<EntityAdapter<GeoKey, String>>,
}

fn geo_harness(cached: CachedRecord<String>, online: bool) -> GeoHarness {
    let store = Arc::new(MemoryStore::with_records([(
        GeoKey::new(5.60, -0.19).unwrap(),
        cached,
    )]));
    let source = Arc::new(GeoSource {
        calls: AtomicU32::new(0),
    });
    let adapter = EntityAdapter::new(
        "air-quality",
        common::MAX_AGE,
        store.clone() as Arc<dyn RecordStore<GeoKey, String>>,
        source.clone() as Arc<dyn RemoteSource<GeoKey, String>>,
    )
    .with_proximity(DEFAULT_PROXIMITY_DEG);
    let connectivity = if online {
        SharedConnectivity::online()
    } else {
        SharedConnectivity::offline()
    };
    let coordinator = SyncCoordinator::with_config(
        adapter,
        Arc::new(connectivity) as Arc<dyn ConnectivityMonitor>,
        Arc::new(ManualClock::new(NOW)),
        CoordinatorConfig::default().with_retry(RetryPolicy::None),
    );
    GeoHarness {
        store,
        source,
        coordinator,
    }
}

#[tokio::test(start_paused = true)]
async fn test_offline_serves_nearby_record() {
    let h = geo_harness(stale("nearby"), false);
    let requested = GeoKey::new(5.65, -0.19).unwrap();

    let outcome = h.coordinator.get(requested).await;

    assert_eq!(error_kind(&outcome), Some(SyncErrorKind::NoConnectivity));
    assert_eq!(value(&outcome), Some("nearby"));
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fresh_nearby_record_skips_fetch() {
    let h = geo_harness(fresh("nearby"), true);

    let outcome = h.coordinator.get(GeoKey::new(5.55, -0.25).unwrap()).await;

    assert!(outcome.is_success());
    assert_eq!(value(&outcome), Some("nearby"));
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stale_nearby_record_is_refreshed_under_requested_key() {
    let h = geo_harness(stale("nearby"), true);
    let requested = GeoKey::new(5.65, -0.19).unwrap();

    let outcome = h.coordinator.get(requested).await;

    assert_eq!(value(&outcome), Some("remote"));
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.store.get(&requested),
        Some(CachedRecord::new("remote".to_string(), NOW))
    );
    assert_eq!(
        h.store.get(&GeoKey::new(5.60, -0.19).unwrap()),
        Some(stale("nearby"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_far_record_is_not_a_fallback() {
    let h = geo_harness(stale("far"), false);

    let outcome = h.coordinator.get(GeoKey::new(5.80, -0.19).unwrap()).await;

    assert_eq!(error_kind(&outcome), Some(SyncErrorKind::NoConnectivity));
    assert!(outcome.value().is_none());
}
