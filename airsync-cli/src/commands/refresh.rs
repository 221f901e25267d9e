//! `airsync refresh` - force-fetch every cached location.

use std::path::Path;

use clap::Args;

use airsync::SyncOutcome;

use super::common::{self, EntityArg};
use crate::error::CliError;

/// Arguments for `refresh`.
#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Entity to refresh (default: all configured entities)
    #[arg(value_enum)]
    pub entity: Option<EntityArg>,
}

/// Run `refresh`.
pub fn run(args: RefreshArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = common::load_config(config_path)?;

    common::runtime()?.block_on(async {
        let (connectivity, _probe) = common::connectivity(&config).await?;

        for kind in common::selected_kinds(args.entity) {
            let Some(coordinator) = common::open_coordinator(&config, kind, &connectivity).await?
            else {
                println!("{}: no endpoint configured, skipped", kind);
                continue;
            };

            let report = coordinator.refresh_all().await?;
            println!("{}: {}", kind, report);
            for (key, outcome) in report.iter() {
                if let SyncOutcome::Error { .. } = outcome {
                    println!("  {}", common::outcome_status(kind, key, outcome));
                }
            }
        }
        Ok::<(), CliError>(())
    })
}
