//! CLI subcommands.

pub mod common;
pub mod config;
pub mod daemon;
pub mod get;
pub mod observe;
pub mod purge;
pub mod refresh;
