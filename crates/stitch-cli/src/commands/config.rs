//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output;
use stitch_core::config::AppConfig;
use stitch_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as JSON (default)
    Show,
    /// Summarize the storage layout
    Validate,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, config: &AppConfig, env: &str) -> Result<(), AppError> {
    match args.command.as_ref().unwrap_or(&ConfigCommand::Show) {
        ConfigCommand::Show => output::print_json(config),
        ConfigCommand::Validate => {
            output::print_success(&format!("Configuration for '{}' is valid", env));
            output::print_kv("Server", &format!("{}:{}", config.server.host, config.server.port));
            output::print_kv("Staging root", &config.storage.staging_root);
            output::print_kv("Artifact root", &config.storage.artifact_root);
            output::print_kv("Upload root", &config.storage.upload_root);
            output::print_kv("Spool root", &config.storage.spool_root);
            output::print_kv("Max chunk bytes", &config.storage.max_chunk_bytes.to_string());
            output::print_kv("Merge concurrency", &config.storage.merge_concurrency.to_string());
        }
    }
    Ok(())
}
