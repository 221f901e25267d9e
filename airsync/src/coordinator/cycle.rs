//! One synchronization cycle.
//!
//! ```text
//! ReadingCache → DecidingFetch ─┬─ fresh ──────────────► Success(cached)
//!                               └─ stale ─► StaleOrLoading(cached)
//!                                              │
//!                              offline ◄───────┤
//!                 Error(NoConnectivity)        ▼
//!                                    Fetching (retry) ─► Persisting ─► Success(new)
//!                                              │
//!                                              └──────► Error(cause, cached)
//! ```

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::CoordinatorInner;
use crate::adapter::SyncAdapter;
use crate::error::{RemoteError, SyncError};
use crate::outcome::SyncOutcome;
use crate::retry::RetryError;

/// Whether the staleness decision applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchMode {
    /// Fetch only when `should_fetch` says so.
    IfStale,
    /// Always fetch.
    Forced,
}

/// Terminal outcome of a cycle plus whether it wrote to the store.
pub(crate) struct CycleResult<T> {
    pub(crate) outcome: SyncOutcome<T>,
    pub(crate) wrote: bool,
}

impl<T> CycleResult<T> {
    fn unchanged(outcome: SyncOutcome<T>) -> Self {
        Self {
            outcome,
            wrote: false,
        }
    }
}

/// Run the state machine for `key` to a terminal outcome.
///
/// The interim `StaleOrLoading` outcome is sent to `interim` when given.
pub(crate) async fn run_cycle<A: SyncAdapter>(
    inner: &CoordinatorInner<A>,
    key: &A::Key,
    mode: FetchMode,
    cancel: &CancellationToken,
    interim: Option<&mpsc::Sender<SyncOutcome<A::Value>>>,
) -> CycleResult<A::Value> {
    let adapter = &inner.adapter;
    let entity = adapter.name();

    let cached = match adapter.read(key).await {
        Ok(cached) => cached,
        Err(e) => {
            warn!(entity, key = %key, error = %e, "Cache read failed");
            return CycleResult::unchanged(SyncOutcome::error(e.into(), None));
        }
    };

    let now = inner.clock.now_millis();
    if mode == FetchMode::IfStale {
        if let Some(record) = &cached {
            if !adapter.should_fetch(Some(record), now) {
                debug!(
                    entity,
                    key = %key,
                    age_ms = record.age(now).as_millis() as u64,
                    "Serving fresh cache"
                );
                return CycleResult::unchanged(SyncOutcome::Success(record.value.clone()));
            }
        }
    }

    let fallback = cached.as_ref().map(|r| r.value.clone());

    if let Some(tx) = interim {
        if cancel.is_cancelled()
            || tx
                .send(SyncOutcome::StaleOrLoading(fallback.clone()))
                .await
                .is_err()
        {
            debug!(entity, key = %key, "Subscriber gone, skipping fetch");
            return CycleResult::unchanged(SyncOutcome::error(SyncError::Cancelled, fallback));
        }
    }

    if !inner.connectivity.is_available() {
        warn!(entity, key = %key, has_fallback = fallback.is_some(), "Offline, skipping fetch");
        return CycleResult::unchanged(SyncOutcome::error(SyncError::NoConnectivity, fallback));
    }

    fetch_and_store(inner, key, mode, cancel, fallback).await
}

/// Fetch with retry under the key's lock, then save.
async fn fetch_and_store<A: SyncAdapter>(
    inner: &CoordinatorInner<A>,
    key: &A::Key,
    mode: FetchMode,
    cancel: &CancellationToken,
    fallback: Option<A::Value>,
) -> CycleResult<A::Value> {
    let adapter = &inner.adapter;
    let entity = adapter.name();

    let Some(_guard) = inner.locks.lock(key, cancel).await else {
        return CycleResult::unchanged(SyncOutcome::error(SyncError::Cancelled, fallback));
    };

    // Another request may have refreshed the key while this one waited.
    if mode == FetchMode::IfStale {
        match adapter.read(key).await {
            Ok(Some(record)) if !adapter.should_fetch(Some(&record), inner.clock.now_millis()) => {
                debug!(entity, key = %key, "Refreshed by a concurrent request");
                return CycleResult::unchanged(SyncOutcome::Success(record.value));
            }
            Ok(_) => {}
            Err(e) => {
                warn!(entity, key = %key, error = %e, "Cache re-read failed");
                return CycleResult::unchanged(SyncOutcome::error(e.into(), None));
            }
        }
    }

    let result = inner
        .retry
        .execute(
            |attempt| {
                debug!(entity, key = %key, attempt, "Fetching");
                adapter.fetch(key)
            },
            |e: &RemoteError| adapter.classify(e),
            cancel,
        )
        .await;

    match result {
        Ok(value) => {
            let fetched_at = inner.clock.now_millis();
            if let Err(e) = adapter.save(key, value.clone(), fetched_at).await {
                warn!(entity, key = %key, error = %e, "Saving fetched value failed");
                return CycleResult::unchanged(SyncOutcome::error(e.into(), fallback));
            }
            debug!(entity, key = %key, "Fetched and saved");
            CycleResult {
                outcome: SyncOutcome::Success(value),
                wrote: true,
            }
        }
        Err(RetryError::Exhausted { attempts, last }) => {
            warn!(entity, key = %key, attempts, error = %last, "Remote unavailable, serving fallback");
            CycleResult::unchanged(SyncOutcome::error(SyncError::TransientRemote(last), fallback))
        }
        Err(RetryError::Permanent { error, .. }) => {
            warn!(entity, key = %key, error = %error, "Remote rejected request");
            CycleResult::unchanged(SyncOutcome::error(SyncError::PermanentRemote(error), fallback))
        }
        Err(RetryError::Cancelled { attempts }) => {
            debug!(entity, key = %key, attempts, "Fetch cancelled");
            CycleResult::unchanged(SyncOutcome::error(SyncError::Cancelled, fallback))
        }
    }
}
