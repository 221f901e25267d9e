//! `airsync daemon` - periodic background refresh and retention sweep.

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use airsync::daemon::{MaintenanceTarget, SyncDaemon};
use airsync::logging;

use super::common;
use crate::error::CliError;

/// Arguments for `daemon`.
#[derive(Debug, Args)]
pub struct DaemonArgs {
    /// Refresh and sweep immediately instead of waiting one interval
    #[arg(long)]
    pub now: bool,
}

/// Run `daemon` until Ctrl+C.
pub fn run(args: DaemonArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = common::load_config(config_path)?;
    let _logging = logging::init_logging(&config.logging.directory, &config.logging.file)
        .map_err(CliError::LoggingInit)?;

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

        let mut daemon = SyncDaemon::new(config.daemon_config().with_run_on_start(args.now));
        for kind in common::selected_kinds(None) {
            if let Some(coordinator) = common::open_coordinator(&config, kind, &connectivity).await?
            {
                daemon.add_target(Arc::new(coordinator) as Arc<dyn MaintenanceTarget>);
            }
        }

        info!(
            storage = %config.storage.directory.display(),
            "Starting airsync daemon (Ctrl+C to stop)"
        );

        let probe_task = tokio::spawn(probe.run(shutdown.clone()));
        daemon.run(shutdown.clone()).await;
        let _ = probe_task.await;
        Ok::<(), CliError>(())
    })
}
