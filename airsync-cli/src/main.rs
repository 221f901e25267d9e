//! airsync CLI - Command-line interface
//!
//! Reads air-quality and weather data through the offline-first sync engine.
//! Cached values are served when the network is down.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::daemon::DaemonArgs;
use commands::get::GetArgs;
use commands::observe::ObserveArgs;
use commands::purge::PurgeArgs;
use commands::refresh::RefreshArgs;

#[derive(Parser)]
#[command(name = "airsync")]
#[command(version, about = "Offline-first air-quality and weather data", long_about = None)]
struct Cli {
    /// Path to config.ini (default: ~/.airsync/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one entity for a location, fetching if the cache is stale
    Get(GetArgs),

    /// Follow one entity for a location, printing every update
    Observe(ObserveArgs),

    /// Force-fetch every cached location
    Refresh(RefreshArgs),

    /// Delete old cached records
    Purge(PurgeArgs),

    /// Run periodic refresh and retention sweeps until Ctrl+C
    Daemon(DaemonArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Get(args) => commands::get::run(args, config_path),
        Commands::Observe(args) => commands::observe::run(args, config_path),
        Commands::Refresh(args) => commands::refresh::run(args, config_path),
        Commands::Purge(args) => commands::purge::run(args, config_path),
        Commands::Daemon(args) => commands::daemon::run(args, config_path),
        Commands::Config(command) => commands::config::run(command, config_path),
    };

    if let Err(e) = result {
        e.exit();
    }
}
