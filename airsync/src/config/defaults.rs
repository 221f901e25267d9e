//! Default values for every configuration setting.

use std::path::PathBuf;
use std::time::Duration;

use super::file::config_directory;
use super::settings::*;
use crate::connectivity::{
    DEFAULT_PROBE_INTERVAL_SECS, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_PROBE_URL,
};
use crate::coordinator::DEFAULT_MAX_CONCURRENT_REFRESHES;
use crate::daemon::{
    DEFAULT_MAX_RECORD_AGE_SECS, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_SWEEP_INTERVAL_SECS,
};
use crate::entity::EntityKind;
use crate::retry::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_SECS,
};

// =============================================================================
// Endpoints
// =============================================================================

/// Nearest air-quality station reading.
pub const DEFAULT_AIR_QUALITY_ENDPOINT: &str =
    "https://api.openaq.org/v2/latest?coordinates={lat},{lon}&radius=5000&limit=1&order_by=distance";

/// Current weather conditions.
pub const DEFAULT_WEATHER_ENDPOINT: &str = "https://wttr.in/{lat},{lon}?format=j1";

/// Three-day forecast.
pub const DEFAULT_FORECAST_ENDPOINT: &str = "https://wttr.in/{lat},{lon}?format=j1&num_of_days=3";

// =============================================================================
// Files
// =============================================================================

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "airsync.log";

/// Default storage directory (~/.airsync/data).
pub fn default_storage_directory() -> PathBuf {
    config_directory().join("data")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            sync: SyncSettings {
                air_quality_max_age: EntityKind::AirQuality.default_max_age(),
                weather_max_age: EntityKind::Weather.default_max_age(),
                forecast_max_age: EntityKind::Forecast.default_max_age(),
                extras_max_age: EntityKind::Extras.default_max_age(),
                max_concurrent_refreshes: DEFAULT_MAX_CONCURRENT_REFRESHES,
            },
            retry: RetrySettings {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
                max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
                multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            },
            retention: RetentionSettings {
                max_record_age: Duration::from_secs(DEFAULT_MAX_RECORD_AGE_SECS),
                sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            },
            schedule: ScheduleSettings {
                refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            },
            connectivity: ConnectivitySettings {
                probe_url: DEFAULT_PROBE_URL.to_string(),
                probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
                probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            },
            storage: StorageSettings {
                directory: default_storage_directory(),
            },
            endpoints: EndpointSettings {
                air_quality: DEFAULT_AIR_QUALITY_ENDPOINT.to_string(),
                weather: DEFAULT_WEATHER_ENDPOINT.to_string(),
                forecast: DEFAULT_FORECAST_ENDPOINT.to_string(),
                extras: None,
            },
            logging: LoggingSettings {
                directory: config_directory(),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
