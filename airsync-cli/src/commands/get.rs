//! `airsync get` - read one entity for a location.

use std::path::Path;

use clap::Args;

use airsync::entity::EntityKind;

use super::common::{self, EntityArg};
use crate::error::CliError;

/// Arguments for `get`.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// Entity to read
    #[arg(value_enum)]
    pub entity: EntityArg,

    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Fetch even if the cached record is still fresh
    #[arg(long)]
    pub force: bool,
}

/// Run `get`.
pub fn run(args: GetArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = common::load_config(config_path)?;
    let kind = EntityKind::from(args.entity);
    let key = common::geo_key(args.lat, args.lon)?;

    common::runtime()?.block_on(async {
        let (connectivity, _probe) = common::connectivity(&config).await?;
        let coordinator = common::require_coordinator(&config, kind, &connectivity).await?;

        let outcome = if args.force {
            coordinator.refresh(key.clone()).await
        } else {
            coordinator.get(key.clone()).await
        };

        common::print_outcome(kind, &key, &outcome);
        Ok::<(), CliError>(())
    })
}
