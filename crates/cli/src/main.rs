//! Lexcase CLI
//!
//! Main entry point for the lexcase command-line tool: indexing legal text,
//! retrieval, RAG chat, case analysis and media analysis.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AnalyzeCommand, ChatCommand, IndexCommand, MediaCommand, SearchCommand, StatsCommand,
};
use lexcase_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Lexcase - legal case assistant with retrieval-augmented answers
#[derive(Parser, Debug)]
#[command(name = "lexcase")]
#[command(about = "Legal case assistant with retrieval-augmented answers", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "LEXCASE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "LEXCASE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Include provider error details in degraded answers
    #[arg(long, global = true)]
    debug_errors: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index legal text files into the vector index
    Index(IndexCommand),

    /// Show the passages retrieved for a query
    Search(SearchCommand),

    /// Answer a question using retrieved legal context
    Chat(ChatCommand),

    /// Extract a structured analysis from case text
    Analyze(AnalyzeCommand),

    /// Analyze an image, audio or video file
    Media(MediaCommand),

    /// Show vector index statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace, cli.config)?.with_overrides(
        None,
        None,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.debug_errors,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("Lexcase CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(
        "Generation: {} ({}), embedding: {} ({})",
        config.generation.provider,
        config.generation.model,
        config.embedding.provider,
        config.embedding.model
    );

    config.ensure_lexcase_dir()?;

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Search(_) => "search",
        Commands::Chat(_) => "chat",
        Commands::Analyze(_) => "analyze",
        Commands::Media(_) => "media",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Index(cmd) => cmd.execute(config).await,
        Commands::Search(cmd) => cmd.execute(config).await,
        Commands::Chat(cmd) => cmd.execute(config).await,
        Commands::Analyze(cmd) => cmd.execute(config).await,
        Commands::Media(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
