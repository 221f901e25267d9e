//! `airsync observe` - follow one entity for a location until Ctrl+C.

use std::path::Path;

use clap::Args;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use airsync::entity::EntityKind;

use super::common::{self, EntityArg};
use crate::error::CliError;

/// Arguments for `observe`.
#[derive(Debug, Args)]
pub struct ObserveArgs {
    /// Entity to follow
    #[arg(value_enum)]
    pub entity: EntityArg,

    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
}

/// Run `observe`.
pub fn run(args: ObserveArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = common::load_config(config_path)?;
    let kind = EntityKind::from(args.entity);
    let key = common::geo_key(args.lat, args.lon)?;

    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    common::runtime()?.block_on(async {
        let (connectivity, probe) = common::connectivity(&config).await?;
        let coordinator = common::require_coordinator(&config, kind, &connectivity).await?;

        let probe_task = tokio::spawn(probe.run(shutdown.clone()));

        println!("Observing {} at {} (Ctrl+C to stop)", kind, key);
        println!();

        let mut stream = coordinator.observe(key.clone());
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                next = stream.next() => match next {
                    Some(outcome) => common::print_outcome(kind, &key, &outcome),
                    None => break,
                },
            }
        }

        stream.cancel();
        shutdown.cancel();
        let _ = probe_task.await;
        Ok::<(), CliError>(())
    })
}
