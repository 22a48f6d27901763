//! Gemini embedding provider.
//!
//! Uses `models/{model}:batchEmbedContents`, splitting large inputs into
//! requests of at most [`MAX_BATCH`] texts. Each request goes through the
//! configured retry policy.

use crate::embeddings::EmbeddingProvider;
use lexcase_core::{AppError, AppResult};
use lexcase_llm::http::{build_http_client, error_from_response, transport_error};
use lexcase_llm::RetryPolicy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Maximum texts per batchEmbedContents request
pub const MAX_BATCH: usize = 100;

const PROVIDER: &str = "Gemini embeddings";

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: EmbedContent<'a>,
}

#[derive(Debug, Serialize)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug)]
pub struct GeminiEmbeddingProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    /// `models/<model>` as the API expects it in request bodies
    model_path: String,
    dimensions: usize,
    retry: RetryPolicy,
}

impl GeminiEmbeddingProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: impl Into<String>,
        dimensions: usize,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> AppResult<Self> {
        // Accept both "text-embedding-004" and "models/text-embedding-004"
        let model = model.into();
        let model = model.strip_prefix("models/").unwrap_or(&model).to_string();
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
            model_path: format!("models/{}", model),
            model,
            dimensions,
            retry,
        })
    }

    #[instrument(skip(self, texts), fields(batch = texts.len(), model = %self.model))]
    async fn embed_request(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!(
            "{}/v1beta/models/{}:batchEmbedContents",
            self.base_url, self.model
        );
        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.model_path,
                    content: EmbedContent {
                        parts: vec![EmbedPart { text }],
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse embedding response: {}", e)))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(AppError::Parse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        parsed
            .embeddings
            .into_iter()
            .map(|embedding| {
                if embedding.values.len() == self.dimensions {
                    Ok(embedding.values)
                } else {
                    Err(AppError::Knowledge(format!(
                        "Model '{}' returned {} dimensions, expected {}",
                        self.model,
                        embedding.values.len(),
                        self.dimensions
                    )))
                }
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            debug!("Embedding batch of {} texts", batch.len());
            let embedded = self
                .retry
                .run("gemini embedding", || self.embed_request(batch))
                .await?;
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}
