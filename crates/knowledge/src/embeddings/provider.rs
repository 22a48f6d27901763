//! Embedding provider trait and factory.

use lexcase_core::config::EmbeddingSettings;
use lexcase_core::{AppError, AppResult};
use lexcase_llm::RetryPolicy;
use std::sync::Arc;

use super::providers::gemini::GeminiEmbeddingProvider;
use super::providers::mock::MockProvider;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "gemini", "mock")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Stand-in used when the configured provider cannot be constructed.
///
/// Reports the configured model and dimensions but fails every request.
#[derive(Debug, Clone)]
pub struct DisabledEmbedder {
    provider: String,
    model: String,
    dimensions: usize,
    reason: String,
}

impl DisabledEmbedder {
    pub fn new(settings: &EmbeddingSettings, reason: impl Into<String>) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for DisabledEmbedder {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Config(self.reason.clone()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(
    settings: &EmbeddingSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "gemini" => {
            let api_key = api_key.filter(|key| !key.is_empty()).ok_or_else(|| {
                AppError::Config(format!(
                    "Gemini embeddings require an API key (set {})",
                    settings.api_key_env
                ))
            })?;
            let provider = GeminiEmbeddingProvider::new(
                api_key,
                settings.endpoint.clone(),
                settings.model.clone(),
                settings.dimensions,
                settings.timeout_secs,
                RetryPolicy::from_config(&settings.retry),
            )?;
            Ok(Arc::new(provider))
        }

        "mock" => Ok(Arc::new(MockProvider::new(settings.dimensions))),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: gemini, mock",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: provider.to_string(),
            dimensions: 64,
            ..EmbeddingSettings::default()
        }
    }

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&settings("mock"), None).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.dimensions(), 64);
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let err = create_provider(&settings("gemini"), None).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let provider = create_provider(&settings("gemini"), Some("key")).unwrap();
        assert_eq!(provider.model_name(), "text-embedding-004");
    }

    #[test]
    fn test_create_unknown_provider() {
        let err = create_provider(&settings("unknown"), None).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_disabled_embedder_fails_requests() {
        let embedder = DisabledEmbedder::new(&settings("gemini"), "no key");
        assert_eq!(embedder.dimensions(), 64);
        assert!(embedder.embed("theft").await.is_err());
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&settings("mock"), None).unwrap();
        let embedding = provider.embed("criminal trespass").await.unwrap();
        assert_eq!(embedding.len(), 64);
    }
}
