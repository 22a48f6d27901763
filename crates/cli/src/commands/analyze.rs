//! Analyze command handler.

use clap::Args;
use lexcase_core::{config::AppConfig, AppError, AppResult};
use lexcase_knowledge::AppContext;
use std::path::PathBuf;

/// Extract a structured analysis from FIR or complaint text
#[derive(Args, Debug)]
pub struct AnalyzeCommand {
    /// File containing the case text
    #[arg(conflicts_with = "text", required_unless_present = "text")]
    pub file: Option<PathBuf>,

    /// Case text given inline
    #[arg(long)]
    pub text: Option<String>,
}

impl AnalyzeCommand {
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing analyze command");

        let text = match (&self.text, &self.file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read {}: {}", path.display(), e))
            })?,
            (None, None) => return Err(AppError::Config("No case text provided".to_string())),
        };

        let ctx = AppContext::from_config(config).await?;
        let analysis = ctx.case_analyzer()?.analyze(&text).await;

        println!("{}", serde_json::to_string_pretty(&analysis)?);
        Ok(())
    }
}
