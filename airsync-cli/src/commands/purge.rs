//! `airsync purge` - delete old cached records.

use std::path::Path;

use clap::Args;

use airsync::config::{format_duration, parse_duration};
use airsync::connectivity::SharedConnectivity;

use super::common::{self, EntityArg};
use crate::error::CliError;

/// Arguments for `purge`.
#[derive(Debug, Args)]
pub struct PurgeArgs {
    /// Entity to purge (default: all configured entities)
    #[arg(value_enum)]
    pub entity: Option<EntityArg>,

    /// Delete records fetched longer ago than this (e.g., 7d, 12h).
    /// Defaults to retention.max_record_age from config.ini
    #[arg(long)]
    pub older_than: Option<String>,

    /// Delete every cached record regardless of age
    #[arg(long, conflicts_with = "older_than")]
    pub all: bool,
}

/// Run `purge`.
pub fn run(args: PurgeArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = common::load_config(config_path)?;
    let retention = match &args.older_than {
        Some(s) => parse_duration(s).map_err(|e| CliError::InvalidInput(e.to_string()))?,
        None => config.retention.max_record_age,
    };

    // Purging never fetches, so skip the probe.
    let connectivity = SharedConnectivity::offline();

    common::runtime()?.block_on(async {
        for kind in common::selected_kinds(args.entity) {
            let Some(coordinator) = common::open_coordinator(&config, kind, &connectivity).await?
            else {
                continue;
            };

            if args.all {
                coordinator.clear().await?;
                println!("{}: cleared", kind);
            } else {
                let removed = coordinator.purge_older_than(retention).await?;
                println!(
                    "{}: removed {} records older than {}",
                    kind,
                    removed,
                    format_duration(retention)
                );
            }
        }
        Ok::<(), CliError>(())
    })
}
