//! Media command handler.

use clap::Args;
use lexcase_core::{config::AppConfig, AppResult};
use lexcase_llm::{create_gemini_client, MediaAnalyzer, PollPolicy};
use std::path::PathBuf;
use std::sync::Arc;

/// Analyze an image, audio or video file with the Gemini Files API
#[derive(Args, Debug)]
pub struct MediaCommand {
    /// Media file to analyze
    pub file: PathBuf,

    /// Instruction for the analysis
    #[arg(long)]
    pub prompt: String,

    /// MIME type (guessed from the extension when omitted)
    #[arg(long)]
    pub mime: Option<String>,
}

impl MediaCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing media command for {}", self.file.display());

        let client = create_gemini_client(&config.generation, config.generation_api_key().as_deref())?;
        let analyzer = MediaAnalyzer::new(
            Arc::new(client),
            config.generation.model.clone(),
            PollPolicy::from_settings(&config.media),
        );

        let answer = analyzer
            .analyze(&self.file, &self.prompt, self.mime.as_deref())
            .await?;

        println!("{}", answer);
        Ok(())
    }
}
