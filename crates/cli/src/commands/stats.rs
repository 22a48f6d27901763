//! Stats command handler.

use clap::Args;
use lexcase_core::{config::AppConfig, AppError, AppResult};
use lexcase_knowledge::AppContext;

/// Show vector index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let ctx = AppContext::from_config(config).await?;
        let stats = ctx
            .store()
            .map(|store| store.stats())
            .ok_or_else(|| AppError::IndexUnavailable("vector index could not be initialized".to_string()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Index:      {}", stats.path.display());
            println!("Model:      {} ({} dimensions)", stats.embedding_model, stats.dimensions);
            println!("Documents:  {}", stats.documents);
            println!("Chunks:     {} ({} entries incl. seed)", stats.chunks, stats.entries);
            println!("Size:       {} bytes", stats.file_size_bytes);
        }

        Ok(())
    }
}
