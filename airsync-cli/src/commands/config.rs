//! Configuration management CLI commands.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use airsync::config::{config_file_path, format_duration, ConfigFile};
use airsync::entity::EntityKind;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// List the effective configuration
    List,

    /// Show the configuration file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);

    match command {
        ConfigCommands::List => run_list(&path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Init { force } => run_init(path, force),
    }
}

/// List the effective configuration.
fn run_list(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    for line in describe(&config) {
        println!("{}", line);
    }
    Ok(())
}

/// Human-readable summary of `config`, one setting per line.
fn describe(config: &ConfigFile) -> Vec<String> {
    let mut lines = vec!["[entities]".to_string()];
    for kind in EntityKind::ALL {
        lines.push(format!(
            "  {:<12} max_age = {:<6} endpoint = {}",
            kind.as_str(),
            format_duration(config.max_age(kind)),
            config.endpoint(kind).unwrap_or("(not set)")
        ));
    }
    lines.push("[retry]".to_string());
    lines.push(format!("  max_attempts = {}", config.retry.max_attempts));
    lines.push(format!(
        "  backoff = {} x{} (max {})",
        format_duration(config.retry.initial_delay),
        config.retry.multiplier,
        format_duration(config.retry.max_delay)
    ));
    lines.push("[maintenance]".to_string());
    lines.push(format!(
        "  refresh every {}, sweep every {}, keep {}",
        format_duration(config.schedule.refresh_interval),
        format_duration(config.retention.sweep_interval),
        format_duration(config.retention.max_record_age)
    ));
    lines.push("[storage]".to_string());
    lines.push(format!("  directory = {}", config.storage.directory.display()));
    lines
}

/// Write a default config file.
fn run_init(path: PathBuf, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    ConfigFile::default().save_to(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
