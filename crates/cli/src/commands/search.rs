//! Search command handler.

use clap::Args;
use lexcase_core::{config::AppConfig, AppError, AppResult};
use lexcase_knowledge::AppContext;

/// Show the passages retrieved for a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of passages to retrieve (default: rag.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");

        let k = self.top_k.unwrap_or(config.rag.top_k);
        let ctx = AppContext::from_config(config).await?;
        let store = ctx.store().ok_or_else(|| {
            AppError::IndexUnavailable("vector index could not be initialized".to_string())
        })?;

        let hits = store.search_scored(&self.query, k).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
            return Ok(());
        }

        if hits.is_empty() {
            println!("No passages found.");
        }
        for (rank, hit) in hits.iter().enumerate() {
            let source = hit.chunk.metadata["source"].as_str().unwrap_or("unknown");
            println!("[{}] score={:.3} source={}", rank + 1, hit.score, source);
            println!("{}\n", hit.chunk.text);
        }

        Ok(())
    }
}
