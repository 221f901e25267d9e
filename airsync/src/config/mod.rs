//! User configuration loaded from `~/.airsync/config.ini`.
//!
//! Every key is optional; missing keys fall back to the defaults in
//! [`defaults`]. Durations accept `ms`, `s`, `m`, `h` and `d` suffixes.
//!
//! # Example
//!
//! ```
//! use airsync::config::ConfigFile;
//! use airsync::entity::EntityKind;
//! use std::time::Duration;
//!
//! let config = ConfigFile::from_ini_str("[sync]\nweather_max_age = 10m\n").unwrap();
//! assert_eq!(config.max_age(EntityKind::Weather), Duration::from_secs(600));
//! ```

mod defaults;
mod duration;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{
    default_storage_directory, CONFIG_FILE_NAME, DEFAULT_AIR_QUALITY_ENDPOINT,
    DEFAULT_FORECAST_ENDPOINT, DEFAULT_LOG_FILE, DEFAULT_WEATHER_ENDPOINT,
};
pub use duration::{format_duration, parse_duration, DurationParseError};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, ConnectivitySettings, EndpointSettings, LoggingSettings, RetentionSettings,
    RetrySettings, ScheduleSettings, StorageSettings, SyncSettings,
};
