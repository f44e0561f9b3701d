//! Remove staging areas of uploads that were never merged.

use std::time::Duration;

use clap::Args;

use crate::output::{self, OutputFormat};
use stitch_core::config::AppConfig;
use stitch_core::error::AppError;
use stitch_storage::chunked::StagingSweeper;
use stitch_storage::{StorageArea, StorageManager};

/// Arguments for the sweep command
#[derive(Debug, Args)]
pub struct SweepArgs {
    /// Remove staging areas untouched for this many hours
    /// (defaults to `storage.staging_ttl_hours`)
    #[arg(long)]
    pub older_than_hours: Option<u64>,
}

/// Execute the sweep command
pub async fn execute(args: &SweepArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let hours = args.older_than_hours.unwrap_or(config.storage.staging_ttl_hours);
    let storage = StorageManager::from_config(&config.storage).await?;
    let sweeper = StagingSweeper::new(storage.get(StorageArea::Staging)?);

    let report = sweeper
        .sweep(Duration::from_secs(hours.saturating_mul(3600)))
        .await?;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_success(&format!(
                "Removed {} of {} staging areas older than {}h",
                report.removed.len(),
                report.scanned,
                hours
            ));
            for dir in &report.removed {
                println!("  {}", dir);
            }
        }
    }
    Ok(())
}
