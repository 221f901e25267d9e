//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::time::Duration;

use ini::{Ini, Properties};

use super::duration::{format_duration, parse_duration};
use super::file::ConfigFileError;
use super::settings::ConfigFile;

const DURATION_HINT: &str = "expected format like '30s', '30m', '3h', or '7d'";

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn duration_value(
    props: &Properties,
    section: &str,
    key: &str,
) -> Result<Option<Duration>, ConfigFileError> {
    props
        .get(key)
        .map(|v| parse_duration(v).map_err(|_| invalid(section, key, v, DURATION_HINT)))
        .transpose()
}

fn url_value(
    props: &Properties,
    section: &str,
    key: &str,
) -> Result<Option<String>, ConfigFileError> {
    match props.get(key).map(str::trim) {
        None => Ok(None),
        Some("") => Err(invalid(section, key, "", "URL must not be empty")),
        Some(v) if !(v.starts_with("http://") || v.starts_with("https://")) => {
            Err(invalid(section, key, v, "URL must start with http:// or https://"))
        }
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [sync] section
    if let Some(section) = ini.section(Some("sync")) {
        if let Some(d) = duration_value(section, "sync", "air_quality_max_age")? {
            config.sync.air_quality_max_age = d;
        }
        if let Some(d) = duration_value(section, "sync", "weather_max_age")? {
            config.sync.weather_max_age = d;
        }
        if let Some(d) = duration_value(section, "sync", "forecast_max_age")? {
            config.sync.forecast_max_age = d;
        }
        if let Some(d) = duration_value(section, "sync", "extras_max_age")? {
            config.sync.extras_max_age = d;
        }
        if let Some(v) = section.get("max_concurrent_refreshes") {
            config.sync.max_concurrent_refreshes = match v.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(invalid(
                        "sync",
                        "max_concurrent_refreshes",
                        v,
                        "must be a positive integer",
                    ))
                }
            };
        }
    }

    // [retry] section
    if let Some(section) = ini.section(Some("retry")) {
        if let Some(v) = section.get("max_attempts") {
            config.retry.max_attempts = match v.trim().parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(invalid(
                        "retry",
                        "max_attempts",
                        v,
                        "must be a positive integer",
                    ))
                }
            };
        }
        if let Some(d) = duration_value(section, "retry", "initial_delay")? {
            config.retry.initial_delay = d;
        }
        if let Some(d) = duration_value(section, "retry", "max_delay")? {
            config.retry.max_delay = d;
        }
        if let Some(v) = section.get("multiplier") {
            config.retry.multiplier = match v.trim().parse::<f64>() {
                Ok(m) if m.is_finite() && m >= 1.0 => m,
                _ => {
                    return Err(invalid(
                        "retry",
                        "multiplier",
                        v,
                        "must be a number >= 1.0",
                    ))
                }
            };
        }
        if config.retry.initial_delay > config.retry.max_delay {
            return Err(invalid(
                "retry",
                "initial_delay",
                &format_duration(config.retry.initial_delay),
                "must not exceed max_delay",
            ));
        }
    }

    // [retention] section
    if let Some(section) = ini.section(Some("retention")) {
        if let Some(d) = duration_value(section, "retention", "max_record_age")? {
            config.retention.max_record_age = d;
        }
        if let Some(d) = duration_value(section, "retention", "sweep_interval")? {
            if d.is_zero() {
                return Err(invalid(
                    "retention",
                    "sweep_interval",
                    "0",
                    "must be greater than zero",
                ));
            }
            config.retention.sweep_interval = d;
        }
    }

    // [schedule] section
    if let Some(section) = ini.section(Some("schedule")) {
        if let Some(d) = duration_value(section, "schedule", "refresh_interval")? {
            if d.is_zero() {
                return Err(invalid(
                    "schedule",
                    "refresh_interval",
                    "0",
                    "must be greater than zero",
                ));
            }
            config.schedule.refresh_interval = d;
        }
    }

    // [connectivity] section
    if let Some(section) = ini.section(Some("connectivity")) {
        if let Some(url) = url_value(section, "connectivity", "probe_url")? {
            config.connectivity.probe_url = url;
        }
        if let Some(d) = duration_value(section, "connectivity", "probe_interval")? {
            if d.is_zero() {
                return Err(invalid(
                    "connectivity",
                    "probe_interval",
                    "0",
                    "must be greater than zero",
                ));
            }
            config.connectivity.probe_interval = d;
        }
        if let Some(d) = duration_value(section, "connectivity", "probe_timeout")? {
            config.connectivity.probe_timeout = d;
        }
    }

    // [storage] section
    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.storage.directory = expand_tilde(v);
            }
        }
    }

    // [endpoints] section
    if let Some(section) = ini.section(Some("endpoints")) {
        if let Some(url) = url_value(section, "endpoints", "air_quality")? {
            config.endpoints.air_quality = url;
        }
        if let Some(url) = url_value(section, "endpoints", "weather")? {
            config.endpoints.weather = url;
        }
        if let Some(url) = url_value(section, "endpoints", "forecast")? {
            config.endpoints.forecast = url;
        }
        // Empty means "no extras source".
        if let Some(v) = section.get("extras") {
            config.endpoints.extras = match v.trim() {
                "" => None,
                _ => url_value(section, "endpoints", "extras")?,
            };
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

/// Expand a leading `~/` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
