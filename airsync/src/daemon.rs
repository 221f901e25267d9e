//! Scheduled background maintenance.
//!
//! The [`SyncDaemon`] is a long-running task that keeps cached tables useful
//! without any caller asking:
//! - every `refresh_interval`, force-refreshes every cached key of every
//!   registered entity
//! - every `sweep_interval`, deletes records older than `max_record_age`
//!
//! # Example
//!
//! ```ignore
//! use airsync::daemon::{DaemonConfig, SyncDaemon};
//!
//! let daemon = SyncDaemon::new(DaemonConfig::default())
//!     .with_target(Arc::new(air_quality_coordinator))
//!     .with_target(Arc::new(weather_coordinator));
//!
//! let shutdown = CancellationToken::new();
//! tokio::spawn(daemon.run(shutdown.clone()));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::SyncAdapter;
use crate::coordinator::SyncCoordinator;
use crate::error::{SyncError, SyncErrorKind};
use crate::store::BoxFuture;

// =============================================================================
// Configuration
// =============================================================================

/// Default time between bulk refreshes (3 hours).
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 3 * 60 * 60;

/// Default time between retention sweeps (24 hours).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Default retention for cached records (7 days).
pub const DEFAULT_MAX_RECORD_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for the maintenance daemon.
#[derive(Clone, Debug, PartialEq)]
pub struct DaemonConfig {
    /// Time between bulk refreshes.
    pub refresh_interval: Duration,
    /// Time between retention sweeps.
    pub sweep_interval: Duration,
    /// Records older than this are deleted by a sweep.
    pub max_record_age: Duration,
    /// Run a refresh and a sweep immediately on start.
    pub run_on_start: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            max_record_age: Duration::from_secs(DEFAULT_MAX_RECORD_AGE_SECS),
            run_on_start: false,
        }
    }
}

impl DaemonConfig {
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_max_record_age(mut self, age: Duration) -> Self {
        self.max_record_age = age;
        self
    }

    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }
}

// =============================================================================
// Maintenance Target
// =============================================================================

/// Entity-agnostic result of a bulk refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub worst: Option<SyncErrorKind>,
}

impl fmt::Display for RefreshSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} refreshed, {} succeeded, {} failed",
            self.refreshed, self.succeeded, self.failed
        )?;
        if let Some(worst) = self.worst {
            write!(f, " (worst: {})", worst)?;
        }
        Ok(())
    }
}

/// Something the daemon can refresh and sweep.
///
/// Type-erases coordinators over different entity types so one daemon can
/// drive them all.
pub trait MaintenanceTarget: Send + Sync + 'static {
    /// Entity name for logs.
    fn name(&self) -> &str;

    /// Force-refresh every cached key.
    fn refresh_all<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<RefreshSummary, SyncError>>;

    /// Delete records older than `retention`.
    fn purge(&self, retention: Duration) -> BoxFuture<'_, Result<usize, SyncError>>;
}

impl<A: SyncAdapter> MaintenanceTarget for SyncCoordinator<A> {
    fn name(&self) -> &str {
        self.adapter().name()
    }

    fn refresh_all<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<RefreshSummary, SyncError>> {
        Box::pin(async move {
            let report = self.refresh_all_with_cancel(cancel).await?;
            Ok(RefreshSummary {
                refreshed: report.len(),
                succeeded: report.succeeded(),
                failed: report.failed(),
                worst: report.worst().map(|(_, e)| e.kind()),
            })
        })
    }

    fn purge(&self, retention: Duration) -> BoxFuture<'_, Result<usize, SyncError>> {
        Box::pin(self.purge_older_than(retention))
    }
}

// =============================================================================
// Daemon
// =============================================================================

/// Periodic refresh and retention sweep over registered targets.
pub struct SyncDaemon {
    config: DaemonConfig,
    targets: Vec<Arc<dyn MaintenanceTarget>>,
}

impl SyncDaemon {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            config,
            targets: Vec::new(),
        }
    }

    /// Register a target.
    pub fn with_target(mut self, target: Arc<dyn MaintenanceTarget>) -> Self {
        self.targets.push(target);
        self
    }

    pub fn add_target(&mut self, target: Arc<dyn MaintenanceTarget>) {
        self.targets.push(target);
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            targets = self.targets.len(),
            refresh_interval_secs = self.config.refresh_interval.as_secs(),
            sweep_interval_secs = self.config.sweep_interval.as_secs(),
            "Sync daemon started"
        );

        let mut refresh = self.ticker(self.config.refresh_interval);
        let mut sweep = self.ticker(self.config.sweep_interval);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Sync daemon shutting down");
                    break;
                }

                _ = refresh.tick() => {
                    self.refresh_targets(&shutdown).await;
                }

                _ = sweep.tick() => {
                    self.sweep_targets().await;
                }
            }
        }
    }

    fn ticker(&self, period: Duration) -> tokio::time::Interval {
        let period = period.max(Duration::from_millis(1));
        let start = if self.config.run_on_start {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// Refresh every target once. Returns one result per target.
    pub async fn refresh_targets(
        &self,
        cancel: &CancellationToken,
    ) -> Vec<(String, Result<RefreshSummary, SyncError>)> {
        let mut results = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            if cancel.is_cancelled() {
                break;
            }
            let result = target.refresh_all(cancel).await;
            match &result {
                Ok(summary) if summary.failed > 0 => {
                    warn!(entity = target.name(), %summary, "Scheduled refresh had failures");
                }
                Ok(summary) => {
                    info!(entity = target.name(), %summary, "Scheduled refresh complete");
                }
                Err(e) => {
                    warn!(entity = target.name(), error = %e, "Scheduled refresh failed");
                }
            }
            results.push((target.name().to_string(), result));
        }
        results
    }

    /// Sweep every target once. Returns the total number of records removed.
    pub async fn sweep_targets(&self) -> usize {
        let mut total = 0;
        for target in &self.targets {
            match target.purge(self.config.max_record_age).await {
                Ok(removed) => {
                    debug!(entity = target.name(), removed, "Retention sweep");
                    total += removed;
                }
                Err(e) => {
                    warn!(entity = target.name(), error = %e, "Retention sweep failed");
                }
            }
        }
        if total > 0 {
            info!(removed = total, "Retention sweep complete");
        }
        total
    }
}
