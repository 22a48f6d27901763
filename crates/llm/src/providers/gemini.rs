//! Gemini provider implementation.
//!
//! Gemini API: https://ai.google.dev/api
//!
//! Covers text generation with conversation history and the Files API used
//! by media analysis (upload, state lookup, generation over an uploaded file).

use crate::client::{ChatRole, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::http::{build_http_client, error_from_response, transport_error};
use crate::retry::RetryPolicy;
use lexcase_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const PROVIDER: &str = "Gemini";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            file_data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    StateUnspecified,
    Processing,
    Active,
    Failed,
    /// A state this client does not know; treated as still processing.
    #[serde(other)]
    Unknown,
}

/// A file known to the Files API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc-123`
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    pub state: FileState,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

/// Gemini client.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl GeminiClient {
    /// Create a client. `base_url` defaults to the public endpoint.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> AppResult<Self> {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            client: build_http_client(timeout_secs)?,
            retry,
        })
    }

    fn to_gemini_request(request: &LlmRequest) -> GenerateContentRequest {
        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|turn| Content {
                role: Some(
                    match turn.role {
                        ChatRole::User => "user",
                        ChatRole::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![Part::text(turn.text.clone())],
            })
            .collect();
        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(request.prompt.clone())],
        });

        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        GenerateContentRequest {
            contents,
            system_instruction: request.system.as_ref().map(|system| Content {
                role: None,
                parts: vec![Part::text(system.clone())],
            }),
            generation_config,
        }
    }

    fn convert_response(model: &str, response: GenerateContentResponse) -> AppResult<LlmResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("Gemini returned no candidates".to_string()))?;

        let content = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage = response
            .usage_metadata
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: model.to_string(),
            usage,
        })
    }

    async fn post_generate(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> AppResult<LlmResponse> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse Gemini response: {}", e)))?;

        Self::convert_response(model, parsed)
    }

    /// Upload a local file to the Files API.
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
        mime_type: &str,
    ) -> AppResult<RemoteFile> {
        let url = format!("{}/upload/v1beta/files", self.base_url);
        let metadata = serde_json::json!({ "file": { "display_name": display_name } });

        self.retry
            .run("gemini upload", || async {
                let metadata_part = reqwest::multipart::Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(|e| AppError::Other(format!("Invalid metadata part: {}", e)))?;
                let file_part = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(display_name.to_string())
                    .mime_str(mime_type)
                    .map_err(|e| AppError::Other(format!("Invalid MIME type {}: {}", mime_type, e)))?;
                let form = reqwest::multipart::Form::new()
                    .part("metadata", metadata_part)
                    .part("file", file_part);

                let response = self
                    .client
                    .post(&url)
                    .header("x-goog-api-key", &self.api_key)
                    .header("X-Goog-Upload-Protocol", "multipart")
                    .multipart(form)
                    .send()
                    .await
                    .map_err(|e| transport_error(PROVIDER, e))?;

                if !response.status().is_success() {
                    return Err(error_from_response(PROVIDER, response).await);
                }

                let uploaded: UploadResponse = response.json().await.map_err(|e| {
                    AppError::Parse(format!("Failed to parse Gemini upload response: {}", e))
                })?;
                Ok(uploaded.file)
            })
            .await
    }

    /// Fetch the current state of an uploaded file by resource name.
    pub async fn get_file(&self, name: &str) -> AppResult<RemoteFile> {
        let url = format!("{}/v1beta/{}", self.base_url, name);

        self.retry
            .run("gemini file lookup", || async {
                let response = self
                    .client
                    .get(&url)
                    .header("x-goog-api-key", &self.api_key)
                    .send()
                    .await
                    .map_err(|e| transport_error(PROVIDER, e))?;

                if !response.status().is_success() {
                    return Err(error_from_response(PROVIDER, response).await);
                }

                response
                    .json::<RemoteFile>()
                    .await
                    .map_err(|e| AppError::Parse(format!("Failed to parse Gemini file: {}", e)))
            })
            .await
    }

    /// Generate content over an uploaded file followed by a text prompt.
    pub async fn generate_with_file(
        &self,
        model: &str,
        file: &RemoteFile,
        prompt: &str,
    ) -> AppResult<LlmResponse> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part {
                        text: None,
                        file_data: Some(FileData {
                            mime_type: file.mime_type.clone(),
                            file_uri: file.uri.clone(),
                        }),
                    },
                    Part::text(prompt),
                ],
            }],
            system_instruction: None,
            generation_config: None,
        };

        self.retry
            .run("gemini media generation", || self.post_generate(model, &body))
            .await
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    #[tracing::instrument(skip_all, fields(model = %request.model))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Gemini");
        tracing::debug!(
            "model={} history_turns={}",
            request.model,
            request.history.len()
        );

        let body = Self::to_gemini_request(request);
        let response = self
            .retry
            .run("gemini generation", || self.post_generate(&request.model, &body))
            .await?;

        tracing::info!("Received completion from Gemini");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatTurn;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key", Some(server.uri()), 5, fast_retry()).unwrap()
    }

    fn text_response(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }],
            "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 5 }
        })
    }

    #[test]
    fn test_history_maps_to_gemini_roles() {
        let request = LlmRequest::new("And the punishment?", "gemini-flash-latest")
            .with_history(vec![
                ChatTurn::user("What is BNS 303?"),
                ChatTurn::assistant("Theft."),
            ])
            .with_system("You are a legal advisor.");

        let body = serde_json::to_value(GeminiClient::to_gemini_request(&request)).unwrap();
        let contents = body["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "And the punishment?");
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are a legal advisor."
        );
        assert!(body.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn test_complete_returns_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-flash-latest:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("Section 303.")))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .complete(&LlmRequest::new("theft?", "gemini-flash-latest"))
            .await
            .unwrap();

        assert_eq!(response.content, "Section 303.");
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-flash-latest:generateContent"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-flash-latest:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .complete(&LlmRequest::new("hello", "gemini-flash-latest"))
            .await
            .unwrap();

        assert_eq!(response.content, "ok");
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-flash-latest:generateContent"))
            .respond_with(ResponseTemplate::new(401).set_body_string("API key not valid"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(&LlmRequest::new("hello", "gemini-flash-latest"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Llm(_)));
    }

    #[tokio::test]
    async fn test_no_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-flash-latest:generateContent"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(&LlmRequest::new("hello", "gemini-flash-latest"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Llm(_)));
    }

    #[tokio::test]
    async fn test_upload_and_get_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .and(header("X-Goog-Upload-Protocol", "multipart"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file": {
                    "name": "files/abc",
                    "uri": "https://example.test/files/abc",
                    "mimeType": "audio/mpeg",
                    "state": "PROCESSING"
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "files/abc",
                "uri": "https://example.test/files/abc",
                "mimeType": "audio/mpeg",
                "state": "ACTIVE"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let uploaded = client
            .upload_file(b"ID3".to_vec(), "statement.mp3", "audio/mpeg")
            .await
            .unwrap();
        assert_eq!(uploaded.state, FileState::Processing);

        let refreshed = client.get_file(&uploaded.name).await.unwrap();
        assert_eq!(refreshed.state, FileState::Active);
    }

    #[test]
    fn test_unknown_file_state_is_tolerated() {
        let file: RemoteFile = serde_json::from_value(serde_json::json!({
            "name": "files/abc",
            "uri": "https://example.test/files/abc",
            "mimeType": "video/mp4",
            "state": "QUEUED_FOR_TRANSCODING"
        }))
        .unwrap();

        assert_eq!(file.state, FileState::Unknown);
    }
}
