//! Top-k passage retrieval.
//!
//! Retrieval is fail-open: any problem (no index, embedding failure,
//! timeout) yields no passages rather than an error.

use crate::store::VectorStore;
use lexcase_core::{AppError, AppResult};
use lexcase_llm::retry::timeout_error;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Retriever {
    store: Option<Arc<VectorStore>>,
    top_k: usize,
    timeout: Duration,
}

impl Retriever {
    pub fn new(store: Option<Arc<VectorStore>>, top_k: usize, timeout: Duration) -> Self {
        Self {
            store,
            top_k,
            timeout,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Passages for `query` using the configured `top_k`.
    pub async fn retrieve(&self, query: &str) -> Vec<String> {
        self.retrieve_k(query, self.top_k).await
    }

    /// Up to `k` passages for `query`, most similar first.
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Vec<String> {
        match self.try_retrieve(query, k).await {
            Ok(passages) => {
                tracing::debug!("Retrieved {} passages (k={})", passages.len(), k);
                passages
            }
            Err(err) => {
                tracing::warn!("Retrieval failed, continuing without context: {}", err);
                Vec::new()
            }
        }
    }

    async fn try_retrieve(&self, query: &str, k: usize) -> AppResult<Vec<String>> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| AppError::IndexUnavailable("vector index not initialized".to_string()))?;

        let hits = tokio::time::timeout(self.timeout, store.search(query, k))
            .await
            .map_err(|_| timeout_error("retrieval", self.timeout))?
            .map_err(|e| AppError::Retrieval(e.to_string()))?;

        Ok(hits.into_iter().map(|chunk| chunk.text).collect())
    }
}
