//! Application context: the single owner of configured providers and the
//! loaded index, handed to every component at construction.

use crate::analysis::CaseAnalyzer;
use crate::embeddings::{create_provider, DisabledEmbedder, EmbeddingProvider};
use crate::indexer::DocumentIndexer;
use crate::rag::RagOrchestrator;
use crate::retriever::Retriever;
use crate::store::VectorStore;
use lexcase_core::{AppConfig, AppResult};
use lexcase_llm::{create_client, DisabledClient, LlmClient};
use lexcase_prompt::{resolve_prompt, CASE_ANALYSIS_PROMPT_ID, LEGAL_CHAT_PROMPT_ID};
use std::sync::Arc;
use std::time::Duration;

pub struct AppContext {
    config: AppConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    /// `None` when the index could not be opened or seeded.
    store: Option<Arc<VectorStore>>,
}

impl AppContext {
    /// Build providers from configuration and open the index.
    ///
    /// Invalid configuration is an error. A provider that cannot be built
    /// (missing API key) is replaced by a disabled stand-in, and an index
    /// that cannot be initialized is left out, so chat still answers with
    /// the degraded notice or without context.
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let embedder: Arc<dyn EmbeddingProvider> =
            match create_provider(&config.embedding, config.embedding_api_key().as_deref()) {
                Ok(embedder) => embedder,
                Err(err) => {
                    tracing::warn!("Embedding provider disabled: {}", err);
                    Arc::new(DisabledEmbedder::new(&config.embedding, err.to_string()))
                }
            };
        let llm: Arc<dyn LlmClient> =
            match create_client(&config.generation, config.generation_api_key().as_deref()) {
                Ok(llm) => llm,
                Err(err) => {
                    tracing::warn!("Generation provider disabled: {}", err);
                    Arc::new(DisabledClient::new(
                        config.generation.provider.clone(),
                        err.to_string(),
                    ))
                }
            };

        Ok(Self::with_providers(config, embedder, llm).await)
    }

    /// Build a context around already constructed providers.
    pub async fn with_providers(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let index_path = config.resolved_index_path();
        let store = match VectorStore::load_or_init(&index_path, Arc::clone(&embedder)).await {
            Ok(store) => Some(Arc::new(store)),
            Err(err) => {
                tracing::error!(
                    "Vector index at {} unavailable, continuing without retrieval: {}",
                    index_path.display(),
                    err
                );
                None
            }
        };

        tracing::info!(
            "Context ready: generation={} ({}), embedding={} ({}), index={}",
            llm.provider_name(),
            config.generation.model,
            embedder.provider_name(),
            embedder.model_name(),
            if store.is_some() { "ready" } else { "unavailable" }
        );

        Self {
            config,
            embedder,
            llm,
            store,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&Arc<VectorStore>> {
        self.store.as_ref()
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    pub fn indexer(&self) -> DocumentIndexer {
        DocumentIndexer::new(
            self.store.clone(),
            self.config.rag.chunk_size,
            self.config.rag.chunk_overlap,
        )
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(
            self.store.clone(),
            self.config.rag.top_k,
            Duration::from_secs(self.config.rag.retrieval_timeout_secs),
        )
    }

    /// Errors only if a workspace prompt override is broken.
    pub fn orchestrator(&self) -> AppResult<RagOrchestrator> {
        let prompt = resolve_prompt(&self.config.workspace, LEGAL_CHAT_PROMPT_ID)?;
        Ok(RagOrchestrator::new(
            self.retriever(),
            Arc::clone(&self.llm),
            self.config.generation.model.clone(),
            prompt,
            Duration::from_secs(self.config.rag.generation_timeout_secs),
            self.config.rag.debug_errors,
        ))
    }

    /// Errors only if a workspace prompt override is broken.
    pub fn case_analyzer(&self) -> AppResult<CaseAnalyzer> {
        let prompt = resolve_prompt(&self.config.workspace, CASE_ANALYSIS_PROMPT_ID)?;
        Ok(CaseAnalyzer::new(
            Arc::clone(&self.llm),
            self.config.generation.model.clone(),
            prompt,
            Duration::from_secs(self.config.rag.generation_timeout_secs),
        ))
    }
}
