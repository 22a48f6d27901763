//! HTTP helpers shared by the provider clients.
//!
//! Maps transport failures and HTTP status codes onto the retryable and
//! non-retryable error kinds.

use lexcase_core::{AppError, AppResult};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Build a reqwest client with a per-request timeout.
pub fn build_http_client(timeout_secs: u64) -> AppResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Classify a non-success HTTP status.
///
/// 408, 429 and 5xx are worth retrying; everything else (400, 401, 403,
/// 404, ...) means the request itself is wrong.
pub fn status_error(provider: &str, status: StatusCode, body: &str) -> AppError {
    let message = format!("{} API error ({}): {}", provider, status, truncate(body, 500));
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        AppError::ProviderUnavailable(message)
    } else {
        AppError::Llm(message)
    }
}

/// Classify a reqwest transport error.
pub fn transport_error(provider: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Timeout(format!("{} request timed out: {}", provider, err))
    } else if err.is_decode() {
        AppError::Parse(format!("Failed to decode {} response: {}", provider, err))
    } else {
        AppError::ProviderUnavailable(format!("Failed to reach {}: {}", provider, err))
    }
}

/// Read the body of a failed response and turn it into an error.
pub async fn error_from_response(provider: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    status_error(provider, status, &body)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
