//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::duration::format_duration;
use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let extras = config.endpoints.extras.as_deref().unwrap_or("");

    format!(
        r#"[sync]
; How long a cached record stays fresh before a read triggers a remote fetch.
; Supports: ms, s, m, h, d suffixes (e.g., 30m, 3h)
air_quality_max_age = {}
weather_max_age = {}
forecast_max_age = {}
extras_max_age = {}
; Keys refreshed in parallel by a bulk refresh
max_concurrent_refreshes = {}

[retry]
; Attempts per fetch, including the first (minimum 1)
max_attempts = {}
; Delay before the first retry, doubled (by multiplier) after each failure
initial_delay = {}
; Upper bound for a single backoff delay
max_delay = {}
multiplier = {}

[retention]
; Records fetched longer ago than this are deleted by the sweep
max_record_age = {}
sweep_interval = {}

[schedule]
; Background refresh of every known key
refresh_interval = {}

[connectivity]
; Any HTTP response from this URL counts as online
probe_url = {}
probe_interval = {}
probe_timeout = {}

[storage]
; One JSON table per entity kind is kept in this directory
directory = {}

[endpoints]
; URL templates. {{lat}} and {{lon}} are replaced with the key's coordinates.
air_quality = {}
weather = {}
forecast = {}
; Optional supplementary source (empty = disabled)
extras = {}

[logging]
directory = {}
file = {}
"#,
        format_duration(config.sync.air_quality_max_age),
        format_duration(config.sync.weather_max_age),
        format_duration(config.sync.forecast_max_age),
        format_duration(config.sync.extras_max_age),
        config.sync.max_concurrent_refreshes,
        config.retry.max_attempts,
        format_duration(config.retry.initial_delay),
        format_duration(config.retry.max_delay),
        config.retry.multiplier,
        format_duration(config.retention.max_record_age),
        format_duration(config.retention.sweep_interval),
        format_duration(config.schedule.refresh_interval),
        config.connectivity.probe_url,
        format_duration(config.connectivity.probe_interval),
        format_duration(config.connectivity.probe_timeout),
        path_to_string(&config.storage.directory),
        config.endpoints.air_quality,
        config.endpoints.weather,
        config.endpoints.forecast,
        extras,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Convert path to string, collapsing the home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
