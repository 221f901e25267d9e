//! Common types and utilities shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use clap::ValueEnum;
use console::style;
use serde_json::Value;

use airsync::clock::SystemClock;
use airsync::config::ConfigFile;
use airsync::connectivity::{ConnectivityMonitor, ConnectivityProbe, SharedConnectivity};
use airsync::coordinator::SyncCoordinator;
use airsync::entity::{EntityAdapter, EntityKind};
use airsync::remote::{HttpJsonSource, RemoteSource};
use airsync::store::{JsonFileStore, RecordStore};
use airsync::{GeoKey, SyncOutcome};

use crate::error::CliError;

/// Coordinator for one entity kind backed by a JSON table and an HTTP source.
pub type JsonCoordinator = SyncCoordinator<EntityAdapter<GeoKey, Value>>;

/// Entity selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum EntityArg {
    /// Live air-quality readings
    AirQuality,
    /// Current weather conditions
    Weather,
    /// Multi-day weather forecast
    Forecast,
    /// Supplementary source configured under [endpoints] extras
    Extras,
}

impl From<EntityArg> for EntityKind {
    fn from(arg: EntityArg) -> Self {
        match arg {
            EntityArg::AirQuality => EntityKind::AirQuality,
            EntityArg::Weather => EntityKind::Weather,
            EntityArg::Forecast => EntityKind::Forecast,
            EntityArg::Extras => EntityKind::Extras,
        }
    }
}

/// Resolve the entity kinds a command applies to. `None` means all of them.
pub fn selected_kinds(entity: Option<EntityArg>) -> Vec<EntityKind> {
    match entity {
        Some(arg) => vec![arg.into()],
        None => EntityKind::ALL.to_vec(),
    }
}

/// Load configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Build the multi-threaded runtime commands run on.
pub fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

/// Build a location key from CLI coordinates.
pub fn geo_key(lat: f64, lon: f64) -> Result<GeoKey, CliError> {
    GeoKey::new(lat, lon).map_err(|e| CliError::InvalidInput(e.to_string()))
}

/// Create the connectivity flag and probe it once.
///
/// The returned probe can be run in the background to keep the flag current.
pub async fn connectivity(
    config: &ConfigFile,
) -> Result<(SharedConnectivity, ConnectivityProbe), CliError> {
    let flag = SharedConnectivity::online();
    let probe = ConnectivityProbe::new(config.probe_config(), flag.clone())
        .map_err(|e| CliError::Config(format!("Failed to create connectivity probe: {}", e)))?;
    probe.probe_once().await;
    Ok((flag, probe))
}

/// Open the coordinator for `kind`.
///
/// Returns `Ok(None)` when no endpoint is configured for the kind.
pub async fn open_coordinator(
    config: &ConfigFile,
    kind: EntityKind,
    connectivity: &SharedConnectivity,
) -> Result<Option<JsonCoordinator>, CliError> {
    let Some(template) = config.endpoint(kind) else {
        return Ok(None);
    };

    let store = JsonFileStore::<GeoKey, Value>::open(config.table_path(kind)).await?;
    let source =
        HttpJsonSource::<GeoKey>::new(kind.as_str(), template).map_err(CliError::Remote)?;

    let mut adapter = EntityAdapter::for_kind(
        kind,
        Arc::new(store) as Arc<dyn RecordStore<GeoKey, Value>>,
        Arc::new(source) as Arc<dyn RemoteSource<GeoKey, Value>>,
    )
    .with_max_age(config.max_age(kind));
    if let Some(tolerance) = kind.default_proximity() {
        adapter = adapter.with_proximity(tolerance);
    }

    Ok(Some(SyncCoordinator::with_config(
        adapter,
        Arc::new(connectivity.clone()) as Arc<dyn ConnectivityMonitor>,
        Arc::new(SystemClock),
        config.coordinator_config(),
    )))
}

/// Open the coordinator for `kind`, failing if it has no endpoint.
pub async fn require_coordinator(
    config: &ConfigFile,
    kind: EntityKind,
    connectivity: &SharedConnectivity,
) -> Result<JsonCoordinator, CliError> {
    open_coordinator(config, kind, connectivity)
        .await?
        .ok_or_else(|| CliError::Config(format!("No endpoint configured for '{}'", kind)))
}

/// One-line status for an outcome, styled for the terminal.
pub fn outcome_status(kind: EntityKind, key: &GeoKey, outcome: &SyncOutcome<Value>) -> String {
    let label = format!("{} {}", kind, key);
    match outcome {
        SyncOutcome::Success(_) => format!("{} {}", style("✓").green(), label),
        SyncOutcome::StaleOrLoading(Some(_)) => {
            format!("{} {} (refreshing, showing cached)", style("…").cyan(), label)
        }
        SyncOutcome::StaleOrLoading(None) => format!("{} {} (loading)", style("…").cyan(), label),
        SyncOutcome::Error {
            error,
            fallback: Some(_),
        } => format!(
            "{} {} (cached; {})",
            style("!").yellow(),
            label,
            style(error).yellow()
        ),
        SyncOutcome::Error {
            error,
            fallback: None,
        } => format!("{} {} ({})", style("✗").red(), label, style(error).red()),
    }
}

/// Print an outcome's status line followed by its value, if any.
pub fn print_outcome(kind: EntityKind, key: &GeoKey, outcome: &SyncOutcome<Value>) {
    println!("{}", outcome_status(kind, key, outcome));
    if let Some(value) = outcome.value() {
        match serde_json::to_string_pretty(value) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airsync::error::SyncError;

    fn plain(s: String) -> String {
        console::strip_ansi_codes(&s).into_owned()
    }

    #[test]
    fn test_selected_kinds() {
        assert_eq!(selected_kinds(None), EntityKind::ALL.to_vec());
        assert_eq!(
            selected_kinds(Some(EntityArg::Forecast)),
            vec![EntityKind::Forecast]
        );
    }

    #[test]
    fn test_geo_key_rejects_out_of_range() {
        assert!(geo_key(91.0, 0.0).is_err());
        assert_eq!(geo_key(-1.2921, 36.8219).unwrap().to_string(), "-1.29,36.82");
    }

    #[test]
    fn test_outcome_status_lines() {
        let key = GeoKey::new(5.6, -0.19).unwrap();
        let kind = EntityKind::Weather;

        let ok = plain(outcome_status(kind, &key, &SyncOutcome::Success(Value::Null)));
        assert_eq!(ok, "✓ weather 5.60,-0.19");

        let degraded = SyncOutcome::error(SyncError::NoConnectivity, Some(Value::Null));
        let line = plain(outcome_status(kind, &key, &degraded));
        assert!(line.starts_with("! weather"));
        assert!(line.contains("cached; no network connectivity"));

        let failed: SyncOutcome<Value> = SyncOutcome::error(SyncError::Cancelled, None);
        assert!(plain(outcome_status(kind, &key, &failed)).starts_with("✗"));
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing.ini");
        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config, ConfigFile::default());
    }
}
