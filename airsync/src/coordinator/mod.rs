//! The synchronized resource coordinator.
//!
//! [`SyncCoordinator`] runs the read-cache / decide / fetch / persist / emit
//! algorithm for one entity type. It is generic over a [`SyncAdapter`] and
//! holds no entity-specific logic.
//!
//! # Calling Modes
//!
//! - [`get`](SyncCoordinator::get): run one cycle, return the terminal outcome
//! - [`observe`](SyncCoordinator::observe): stream every transition, re-running
//!   whenever the key's record changes outside this subscription
//! - [`refresh_all`](SyncCoordinator::refresh_all): force-fetch every cached key
//!
//! # Concurrency
//!
//! Fetch and save for one key run under a per-key async mutex, so saves to
//! the same key never interleave and concurrent `get`s for a stale key
//! trigger a single remote fetch. Different keys proceed independently.

mod cycle;
mod locks;
mod report;
mod stream;

pub use report::RefreshReport;
pub use stream::OutcomeStream;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::adapter::SyncAdapter;
use crate::clock::{Clock, SystemClock};
use crate::connectivity::ConnectivityMonitor;
use crate::error::SyncError;
use crate::outcome::SyncOutcome;
use crate::retry::{RetryController, RetryPolicy};

use cycle::{run_cycle, FetchMode};
use locks::KeyLocks;

/// Default bound on concurrent fetches during a bulk refresh.
pub const DEFAULT_MAX_CONCURRENT_REFRESHES: usize = 4;

/// Default capacity of an observe subscription's channel.
pub const DEFAULT_OUTCOME_BUFFER: usize = 16;

/// Coordinator tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Retry policy for each remote fetch.
    pub retry: RetryPolicy,
    /// Maximum keys fetched at once by `refresh_all`.
    pub max_concurrent_refreshes: usize,
    /// Outcomes buffered per subscription before the producer waits.
    pub outcome_buffer: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_concurrent_refreshes: DEFAULT_MAX_CONCURRENT_REFRESHES,
            outcome_buffer: DEFAULT_OUTCOME_BUFFER,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_concurrent_refreshes(mut self, max: usize) -> Self {
        self.max_concurrent_refreshes = max.max(1);
        self
    }

    pub fn with_outcome_buffer(mut self, capacity: usize) -> Self {
        self.outcome_buffer = capacity.max(1);
        self
    }
}

pub(crate) struct CoordinatorInner<A: SyncAdapter> {
    pub(crate) adapter: A,
    pub(crate) connectivity: Arc<dyn ConnectivityMonitor>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) retry: RetryController,
    pub(crate) locks: KeyLocks<A::Key>,
    pub(crate) config: CoordinatorConfig,
}

/// Offline-first coordinator for one entity type.
///
/// Cheap to clone; clones share locks and collaborators.
pub struct SyncCoordinator<A: SyncAdapter> {
    inner: Arc<CoordinatorInner<A>>,
}

impl<A: SyncAdapter> Clone for SyncCoordinator<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: SyncAdapter> SyncCoordinator<A> {
    /// Create a coordinator with the system clock and default configuration.
    pub fn new(adapter: A, connectivity: Arc<dyn ConnectivityMonitor>) -> Self {
        Self::with_config(
            adapter,
            connectivity,
            Arc::new(SystemClock),
            CoordinatorConfig::default(),
        )
    }

    /// Create a coordinator with explicit clock and configuration.
    pub fn with_config(
        adapter: A,
        connectivity: Arc<dyn ConnectivityMonitor>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                adapter,
                connectivity,
                clock,
                retry: RetryController::new(config.retry.clone()),
                locks: KeyLocks::new(),
                config,
            }),
        }
    }

    /// The entity adapter.
    pub fn adapter(&self) -> &A {
        &self.inner.adapter
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Run one cycle for `key` and return its terminal outcome.
    ///
    /// Serves the cache when it is fresh. Otherwise fetches (with retry) and
    /// returns the new value, or an error carrying the cached value.
    pub async fn get(&self, key: A::Key) -> SyncOutcome<A::Value> {
        self.get_with_cancel(key, &CancellationToken::new()).await
    }

    /// Like [`get`](Self::get), but stops retrying when `cancel` fires.
    ///
    /// A cancelled request returns `Error(Cancelled, cached)`. A fetch that
    /// already landed is still saved.
    pub async fn get_with_cancel(
        &self,
        key: A::Key,
        cancel: &CancellationToken,
    ) -> SyncOutcome<A::Value> {
        run_cycle(&self.inner, &key, FetchMode::IfStale, cancel, None)
            .await
            .outcome
    }

    /// Fetch `key` now, ignoring staleness.
    pub async fn refresh(&self, key: A::Key) -> SyncOutcome<A::Value> {
        run_cycle(
            &self.inner,
            &key,
            FetchMode::Forced,
            &CancellationToken::new(),
            None,
        )
        .await
        .outcome
    }

    /// Subscribe to `key`.
    ///
    /// Emits every transition of the first cycle, then re-runs the cycle
    /// each time the key's record is changed by someone other than this
    /// subscription. Requires a tokio runtime.
    pub fn observe(&self, key: A::Key) -> OutcomeStream<A::Value> {
        let (tx, rx) = mpsc::channel(self.inner.config.outcome_buffer.max(1));
        let token = CancellationToken::new();

        tokio::spawn(observe_loop(
            Arc::clone(&self.inner),
            key,
            tx,
            token.clone(),
        ));

        OutcomeStream::new(rx, token)
    }

    /// Force-fetch every cached key.
    ///
    /// Keys are fetched concurrently, each with its own retry budget. A
    /// failing key does not affect the others.
    ///
    /// # Errors
    ///
    /// Fails only if the list of keys cannot be read.
    pub async fn refresh_all(&self) -> Result<RefreshReport<A::Key, A::Value>, SyncError> {
        self.refresh_all_with_cancel(&CancellationToken::new()).await
    }

    /// Like [`refresh_all`](Self::refresh_all), but stops retrying when `cancel` fires.
    pub async fn refresh_all_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RefreshReport<A::Key, A::Value>, SyncError> {
        let inner: &CoordinatorInner<A> = &self.inner;
        let keys = inner.adapter.keys().await?;
        let entity = inner.adapter.name();
        debug!(entity, keys = keys.len(), "Refreshing all keys");

        let outcomes: Vec<_> = futures::stream::iter(keys)
            .map(|key| async move {
                let result = run_cycle(inner, &key, FetchMode::Forced, cancel, None).await;
                (key, result.outcome)
            })
            .buffer_unordered(inner.config.max_concurrent_refreshes.max(1))
            .collect()
            .await;

        let report = RefreshReport::new(outcomes);
        info!(
            entity,
            refreshed = report.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Bulk refresh complete"
        );
        Ok(report)
    }

    /// Delete records older than `retention`. Returns how many were removed.
    pub async fn purge_older_than(&self, retention: Duration) -> Result<usize, SyncError> {
        let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
        let cutoff = self.inner.clock.now_millis().saturating_sub(retention_ms);
        let removed = self.inner.adapter.delete_older_than(cutoff).await?;
        if removed > 0 {
            info!(entity = self.inner.adapter.name(), removed, "Purged old records");
        }
        Ok(removed)
    }

    /// Delete every cached record for this entity.
    pub async fn clear(&self) -> Result<(), SyncError> {
        self.inner.adapter.clear().await?;
        info!(entity = self.inner.adapter.name(), "Cleared cache");
        Ok(())
    }
}

/// Body of an `observe` subscription.
///
/// Cycles run one after another in this task, so outcomes are delivered in
/// completion order. Revisions seen at the start of a cycle, plus the one
/// produced by this cycle's own save, are not treated as external changes.
async fn observe_loop<A: SyncAdapter>(
    inner: Arc<CoordinatorInner<A>>,
    key: A::Key,
    tx: mpsc::Sender<SyncOutcome<A::Value>>,
    token: CancellationToken,
) {
    let entity = inner.adapter.name().to_string();
    let mut changes = inner.adapter.changes(&key);
    debug!(entity = %entity, key = %key, "Subscription started");

    loop {
        let seen = changes.as_mut().map(|rx| *rx.borrow_and_update());

        let result = run_cycle(&inner, &key, FetchMode::IfStale, &token, Some(&tx)).await;
        if token.is_cancelled() {
            break;
        }
        if tx.send(result.outcome).await.is_err() {
            break;
        }

        let Some(rx) = changes.as_mut() else {
            token.cancelled().await;
            break;
        };

        if let Some(seen) = seen {
            let own_write = seen.wrapping_add(u64::from(result.wrote));
            if *rx.borrow() == own_write {
                rx.borrow_and_update();
            }
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    // Store went away; nothing more can change.
                    token.cancelled().await;
                    break;
                }
                debug!(entity = %entity, key = %key, "Record changed, re-running");
            }
        }
    }

    debug!(entity = %entity, key = %key, "Subscription ended");
}
