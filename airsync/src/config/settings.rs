//! Settings structs, one per `[section]` of config.ini.

use std::path::PathBuf;
use std::time::Duration;

use crate::connectivity::ProbeConfig;
use crate::coordinator::CoordinatorConfig;
use crate::daemon::DaemonConfig;
use crate::entity::EntityKind;
use crate::retry::RetryPolicy;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub sync: SyncSettings,
    pub retry: RetrySettings,
    pub retention: RetentionSettings,
    pub schedule: ScheduleSettings,
    pub connectivity: ConnectivitySettings,
    pub storage: StorageSettings,
    pub endpoints: EndpointSettings,
    pub logging: LoggingSettings,
}

/// Freshness windows and bulk refresh concurrency.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub air_quality_max_age: Duration,
    pub weather_max_age: Duration,
    pub forecast_max_age: Duration,
    pub extras_max_age: Duration,
    pub max_concurrent_refreshes: usize,
}

/// Backoff for remote fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

/// Retention sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionSettings {
    pub max_record_age: Duration,
    pub sweep_interval: Duration,
}

/// Periodic background refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSettings {
    pub refresh_interval: Duration,
}

/// Reachability probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivitySettings {
    pub probe_url: String,
    pub probe_interval: Duration,
    pub probe_timeout: Duration,
}

/// Where entity tables are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    pub directory: PathBuf,
}

/// Remote URL templates. `{lat}` and `{lon}` are replaced per key.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSettings {
    pub air_quality: String,
    pub weather: String,
    pub forecast: String,
    pub extras: Option<String>,
}

/// Log file location.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl ConfigFile {
    /// Freshness window for `kind`.
    pub fn max_age(&self, kind: EntityKind) -> Duration {
        match kind {
            EntityKind::AirQuality => self.sync.air_quality_max_age,
            EntityKind::Weather => self.sync.weather_max_age,
            EntityKind::Forecast => self.sync.forecast_max_age,
            EntityKind::Extras => self.sync.extras_max_age,
        }
    }

    /// URL template for `kind`, if one is configured.
    pub fn endpoint(&self, kind: EntityKind) -> Option<&str> {
        match kind {
            EntityKind::AirQuality => Some(&self.endpoints.air_quality),
            EntityKind::Weather => Some(&self.endpoints.weather),
            EntityKind::Forecast => Some(&self.endpoints.forecast),
            EntityKind::Extras => self.endpoints.extras.as_deref(),
        }
    }

    /// Path of the JSON table for `kind`.
    pub fn table_path(&self, kind: EntityKind) -> PathBuf {
        self.storage
            .directory
            .join(format!("{}.json", kind.table_name()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::ExponentialBackoff {
            max_attempts: self.retry.max_attempts,
            initial_delay: self.retry.initial_delay,
            max_delay: self.retry.max_delay,
            multiplier: self.retry.multiplier,
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_retry(self.retry_policy())
            .with_max_concurrent_refreshes(self.sync.max_concurrent_refreshes)
    }

    pub fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig::default()
            .with_refresh_interval(self.schedule.refresh_interval)
            .with_sweep_interval(self.retention.sweep_interval)
            .with_max_record_age(self.retention.max_record_age)
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig::default()
            .with_url(self.connectivity.probe_url.clone())
            .with_interval(self.connectivity.probe_interval)
            .with_timeout(self.connectivity.probe_timeout)
    }
}
