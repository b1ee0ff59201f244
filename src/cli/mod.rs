//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// airsync - incremental air quality data sync
#[derive(Parser, Debug)]
#[command(name = "airsync")]
#[command(version, about, long_about = None)]
#[command(author = "airsync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "airsync.toml", env = "AIRSYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "AIRSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync locations and new measurements into the configured store
    Sync(commands::sync::SyncArgs),

    /// Show the current watermark and row counts
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
