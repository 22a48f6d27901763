//! Index command handler.

use clap::Args;
use lexcase_core::{config::AppConfig, AppError, AppResult};
use lexcase_knowledge::AppContext;
use std::path::PathBuf;

/// Index legal text files
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Files or directories to index
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// File extensions to include (default: txt,md)
    #[arg(long, value_delimiter = ',')]
    pub ext: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command for {} paths", self.paths.len());

        let ctx = AppContext::from_config(config).await?;
        if ctx.store().is_none() {
            return Err(AppError::IndexUnavailable(
                "vector index could not be initialized".to_string(),
            ));
        }

        let report = ctx.indexer().index_paths(&self.paths, &self.ext).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!(
                "Indexed {} documents ({} chunks) in {}ms; {} unchanged, {} empty",
                report.documents_indexed,
                report.chunks_added,
                report.duration_ms,
                report.unchanged,
                report.empty
            );
            for failure in &report.failures {
                eprintln!("  failed: {}: {}", failure.path.display(), failure.reason);
            }
        }

        Ok(())
    }
}
