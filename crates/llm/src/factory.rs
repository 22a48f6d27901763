//! LLM provider factory.
//!
//! Builds generation clients from configuration, resolving the endpoint,
//! API key and retry policy.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use crate::providers::{GeminiClient, OllamaClient};
use crate::retry::RetryPolicy;
use lexcase_core::config::ProviderSettings;
use lexcase_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a generation client for the configured provider.
///
/// # Errors
/// Returns `AppError::Config` if:
/// - Provider is unknown
/// - Gemini is selected and no API key is available
/// - HTTP client initialization fails
pub fn create_client(
    settings: &ProviderSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    match settings.provider.to_lowercase().as_str() {
        "gemini" => Ok(Arc::new(create_gemini_client(settings, api_key)?)),
        "ollama" => {
            let client = OllamaClient::new(
                settings.endpoint.clone(),
                settings.timeout_secs,
                RetryPolicy::from_config(&settings.retry),
            )?;
            Ok(Arc::new(client))
        }
        other => Err(AppError::Config(format!("Unknown provider: {}", other))),
    }
}

/// Create the concrete Gemini client. Media analysis needs the Files API,
/// which is not part of the [`LlmClient`] trait.
pub fn create_gemini_client(
    settings: &ProviderSettings,
    api_key: Option<&str>,
) -> AppResult<GeminiClient> {
    let api_key = api_key.filter(|key| !key.is_empty()).ok_or_else(|| {
        AppError::Config(format!(
            "Gemini provider requires an API key (set {})",
            settings.api_key_env
        ))
    })?;

    GeminiClient::new(
        api_key,
        settings.endpoint.clone(),
        settings.timeout_secs,
        RetryPolicy::from_config(&settings.retry),
    )
}

/// Stand-in used when a provider cannot be constructed (typically a missing
/// API key). Every request fails with the construction error, which keeps
/// callers with a fallback path working.
#[derive(Debug, Clone)]
pub struct DisabledClient {
    provider: String,
    reason: String,
}

impl DisabledClient {
    pub fn new(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for DisabledClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::Config(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> ProviderSettings {
        ProviderSettings {
            provider: provider.to_string(),
            ..ProviderSettings::default()
        }
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client(&settings("ollama"), None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_gemini_client() {
        let client = create_client(&settings("gemini"), Some("key")).unwrap();
        assert_eq!(client.provider_name(), "gemini");
    }

    #[test]
    fn test_gemini_requires_api_key() {
        match create_client(&settings("gemini"), None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("GEMINI_API_KEY")),
            Err(other) => panic!("Unexpected error: {}", other),
            Ok(_) => panic!("Expected error for Gemini without API key"),
        }
    }

    #[tokio::test]
    async fn test_disabled_client_reports_reason() {
        let client = DisabledClient::new("gemini", "missing GEMINI_API_KEY");
        let err = client
            .complete(&LlmRequest::new("hi", "gemini-flash-latest"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing GEMINI_API_KEY"));
    }

    #[test]
    fn test_unknown_provider() {
        match create_client(&settings("unknown"), None) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
