//! CLI command definitions and dispatch.

pub mod config;
pub mod files;
pub mod serve;
pub mod sweep;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use stitch_core::config::AppConfig;
use stitch_core::error::AppError;

/// Stitch: chunked upload server
#[derive(Debug, Parser)]
#[command(name = "stitch", version, about, long_about = None)]
pub struct Cli {
    /// Configuration overlay to load (`config/<env>.toml`)
    #[arg(short, long, global = true, env = "STITCH_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the Stitch server
    Serve(serve::ServeArgs),
    /// List stored files
    Files,
    /// Remove abandoned staging areas
    Sweep(sweep::SweepArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(&self.env)?;
        match &self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Files => files::execute(&config, self.format).await,
            Commands::Sweep(args) => sweep::execute(args, &config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, &self.env),
        }
    }

    /// Log level used when `RUST_LOG` is unset.
    pub fn default_log_level(&self) -> String {
        match &self.command {
            Commands::Serve(_) => load_config(&self.env)
                .map(|c| c.logging.level)
                .unwrap_or_else(|_| "info".to_string()),
            _ => "warn".to_string(),
        }
    }
}

/// Helper: load configuration for an environment
pub fn load_config(env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(env)
}
