//! Configuration management for Lexcase.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.lexcase/config.yaml` or `LEXCASE_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Credentials are never stored in the file itself; the file names the
//! environment variable that holds each API key.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Generation providers the LLM factory knows how to build.
pub const GENERATION_PROVIDERS: &[&str] = &["gemini", "ollama"];

/// Embedding providers the knowledge crate knows how to build.
pub const EMBEDDING_PROVIDERS: &[&str] = &["gemini", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .lexcase/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation (chat / analysis) provider settings
    pub generation: ProviderSettings,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Chunking, retrieval and fallback tuning
    pub rag: RagSettings,

    /// Media upload polling limits
    pub media: MediaSettings,

    /// Persisted vector index location (relative paths resolve against the workspace)
    pub index_path: PathBuf,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON
    pub log_json: bool,
}

/// Retry policy for a remote provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Backoff before the second attempt, doubled afterwards
    pub initial_backoff_ms: u64,

    /// Upper bound for a single backoff
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 2_000,
        }
    }
}

/// Settings for the generation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderSettings {
    /// Provider identifier ("gemini", "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint (base URL)
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Per-request HTTP timeout
    pub timeout_secs: u64,

    pub retry: RetryConfig,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-flash-latest".to_string(),
            endpoint: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
            retry: RetryConfig::default(),
        }
    }
}

/// Settings for the embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider identifier ("gemini", "mock")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint (base URL)
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Expected vector dimension
    pub dimensions: usize,

    /// Per-request HTTP timeout
    pub timeout_secs: u64,

    pub retry: RetryConfig,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "text-embedding-004".to_string(),
            endpoint: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            dimensions: 768,
            timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

/// Chunking, retrieval and fallback tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RagSettings {
    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Passages retrieved per query
    pub top_k: usize,

    /// Deadline for the retrieval stage of a chat request
    pub retrieval_timeout_secs: u64,

    /// Deadline for the generation stage of a chat request
    pub generation_timeout_secs: u64,

    /// Include raw error details in degraded notices
    pub debug_errors: bool,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 2,
            retrieval_timeout_secs: 15,
            generation_timeout_secs: 90,
            debug_errors: false,
        }
    }
}

/// Limits for waiting on asynchronous media processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaSettings {
    /// First delay between state polls
    pub poll_interval_ms: u64,

    /// Upper bound for the delay between polls
    pub max_poll_interval_ms: u64,

    /// Give up after this long
    pub max_wait_secs: u64,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            max_poll_interval_ms: 10_000,
            max_wait_secs: 300,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    generation: Option<ProviderSettings>,
    embedding: Option<EmbeddingSettings>,
    rag: Option<RagSettings>,
    media: Option<MediaSettings>,
    index: Option<IndexFileConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexFileConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            generation: ProviderSettings::default(),
            embedding: EmbeddingSettings::default(),
            rag: RagSettings::default(),
            media: MediaSettings::default(),
            index_path: PathBuf::from(".lexcase/index/legal_index.json"),
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `LEXCASE_WORKSPACE`: Override workspace path
    /// - `LEXCASE_CONFIG`: Path to config file
    /// - `LEXCASE_GENERATION_PROVIDER` / `LEXCASE_GENERATION_MODEL`
    /// - `LEXCASE_EMBEDDING_PROVIDER` / `LEXCASE_EMBEDDING_MODEL`
    /// - `LEXCASE_INDEX_PATH`: Persisted index file
    /// - `LEXCASE_DEBUG_ERRORS`: Show raw errors in degraded notices
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use lexcase_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {:?}", config.resolved_index_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`load`](Self::load), with an explicit workspace and config file
    /// taking precedence over `LEXCASE_WORKSPACE` and `LEXCASE_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("LEXCASE_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("LEXCASE_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.lexcase_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        config.apply_env();

        Ok(config)
    }

    /// Apply environment variable overrides on top of file settings.
    fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("LEXCASE_GENERATION_PROVIDER") {
            self.generation.provider = provider;
        }
        if let Ok(model) = std::env::var("LEXCASE_GENERATION_MODEL") {
            self.generation.model = model;
        }
        if let Ok(provider) = std::env::var("LEXCASE_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Ok(model) = std::env::var("LEXCASE_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Ok(path) = std::env::var("LEXCASE_INDEX_PATH") {
            self.index_path = PathBuf::from(path);
        }
        if let Ok(flag) = std::env::var("LEXCASE_DEBUG_ERRORS") {
            self.rag.debug_errors = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }
        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }
        if let Some(media) = config_file.media {
            result.media = media;
        }
        if let Some(path) = config_file.index.and_then(|index| index.path) {
            result.index_path = PathBuf::from(path);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        debug_errors: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if debug_errors {
            self.rag.debug_errors = true;
        }

        self
    }

    /// Get the path to the .lexcase directory.
    pub fn lexcase_dir(&self) -> PathBuf {
        self.workspace.join(".lexcase")
    }

    /// Ensure the .lexcase directory exists.
    pub fn ensure_lexcase_dir(&self) -> AppResult<()> {
        let dir = self.lexcase_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .lexcase directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Index path resolved against the workspace.
    pub fn resolved_index_path(&self) -> PathBuf {
        if self.index_path.is_absolute() {
            self.index_path.clone()
        } else {
            self.workspace.join(&self.index_path)
        }
    }

    /// Resolve the generation API key from its environment variable.
    pub fn generation_api_key(&self) -> Option<String> {
        read_key(&self.generation.api_key_env)
    }

    /// Resolve the embedding API key from its environment variable.
    pub fn embedding_api_key(&self) -> Option<String> {
        read_key(&self.embedding.api_key_env)
    }

    /// Validate provider names and RAG tuning values.
    ///
    /// Missing credentials are not a validation error: the chat surface must
    /// stay up and report a degraded notice instead.
    pub fn validate(&self) -> AppResult<()> {
        if !GENERATION_PROVIDERS.contains(&self.generation.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown generation provider: {}. Supported: {}",
                self.generation.provider,
                GENERATION_PROVIDERS.join(", ")
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.rag.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be positive".to_string()));
        }

        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }

        if self.rag.top_k == 0 {
            return Err(AppError::Config("topK must be positive".to_string()));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be positive".to_string(),
            ));
        }

        for (name, retry) in [
            ("generation", &self.generation.retry),
            ("embedding", &self.embedding.retry),
        ] {
            if retry.max_attempts == 0 {
                return Err(AppError::Config(format!(
                    "{} retry maxAttempts must be at least 1",
                    name
                )));
            }
        }

        Ok(())
    }
}

fn read_key(env_var: &str) -> Option<String> {
    std::env::var(env_var).ok().filter(|key| !key.trim().is_empty())
}
