//! Chat command handler.

use clap::Args;
use lexcase_core::{config::AppConfig, AppError, AppResult};
use lexcase_knowledge::AppContext;
use lexcase_llm::ChatTurn;
use std::path::{Path, PathBuf};

/// Answer a question using retrieved legal context
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// The question to ask
    pub message: String,

    /// JSON file with prior turns: [{"role": "user"|"assistant", "text": "..."}]
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Output as JSON (answer, context, degraded)
    #[arg(long)]
    pub json: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let history = match &self.history {
            Some(path) => read_history(path)?,
            None => Vec::new(),
        };

        let ctx = AppContext::from_config(config).await?;
        let response = ctx.orchestrator()?.answer(&self.message, &history).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            println!("{}", response.answer);
        }

        Ok(())
    }
}

fn read_history(path: &Path) -> AppResult<Vec<ChatTurn>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read history file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        AppError::Config(format!("Invalid history file {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_history() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("history.json");
        std::fs::write(
            &path,
            r#"[{"role": "user", "text": "My bike was stolen."}, {"role": "assistant", "text": "When?"}]"#,
        )
        .unwrap();

        let history = read_history(&path).unwrap();
        assert_eq!(history, vec![ChatTurn::user("My bike was stolen."), ChatTurn::assistant("When?")]);
    }

    #[test]
    fn test_invalid_history_is_config_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("history.json");
        std::fs::write(&path, r#"[{"role": "judge", "text": "x"}]"#).unwrap();

        assert!(matches!(read_history(&path), Err(AppError::Config(_))));
    }
}
