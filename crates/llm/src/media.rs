//! Multimodal analysis of audio, video and image evidence.
//!
//! A file is uploaded to the Gemini Files API. Video needs server-side
//! processing before it can be referenced, so its state is polled with
//! bounded exponential backoff until it becomes `ACTIVE` or `FAILED`.

use crate::providers::{FileState, GeminiClient, RemoteFile};
use lexcase_core::config::MediaSettings;
use lexcase_core::{AppError, AppResult};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Delay schedule and overall deadline for state polling.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_wait: Duration,
}

impl PollPolicy {
    pub fn from_settings(settings: &MediaSettings) -> Self {
        Self {
            initial_interval: Duration::from_millis(settings.poll_interval_ms),
            max_interval: Duration::from_millis(settings.max_poll_interval_ms),
            max_wait: Duration::from_secs(settings.max_wait_secs),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_settings(&MediaSettings::default())
    }
}

/// Outcome of a single poll.
#[derive(Debug)]
pub enum PollStatus<T> {
    Pending,
    Ready(T),
}

/// Call `check` until it reports `Ready`, doubling the delay between calls up
/// to `max_interval`. Errors from `check` end polling immediately.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, label: &str, mut check: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<PollStatus<T>>>,
{
    let deadline = Instant::now() + policy.max_wait;
    let mut interval = policy.initial_interval;

    loop {
        if let PollStatus::Ready(value) = check().await? {
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(AppError::Timeout(format!(
                "{} still pending after {}s",
                label,
                policy.max_wait.as_secs()
            )));
        }

        let sleep_for = interval.min(deadline - now);
        debug!("{} pending, polling again in {}ms", label, sleep_for.as_millis());
        tokio::time::sleep(sleep_for).await;
        interval = interval.saturating_mul(2).min(policy.max_interval);
    }
}

/// Guess a MIME type from the file extension.
pub fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(mime)
}

/// Runs prompts over uploaded evidence files.
///
/// Unlike chat, failures here are returned to the caller.
pub struct MediaAnalyzer {
    client: Arc<GeminiClient>,
    model: String,
    poll: PollPolicy,
}

impl MediaAnalyzer {
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>, poll: PollPolicy) -> Self {
        Self {
            client,
            model: model.into(),
            poll,
        }
    }

    pub async fn analyze(
        &self,
        path: &Path,
        prompt: &str,
        mime_type: Option<&str>,
    ) -> AppResult<String> {
        if !path.is_file() {
            return Err(AppError::Config(format!(
                "Media file not found: {}",
                path.display()
            )));
        }

        let mime = match mime_type {
            Some(mime) => mime.to_string(),
            None => guess_mime(path)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "Cannot determine MIME type for {}; pass one explicitly",
                        path.display()
                    ))
                })?
                .to_string(),
        };

        let display_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("evidence")
            .to_string();
        let bytes = tokio::fs::read(path).await?;

        info!("Uploading {} ({} bytes, {})", display_name, bytes.len(), mime);
        let mut file = self.client.upload_file(bytes, &display_name, &mime).await?;

        if mime.starts_with("video/") {
            file = self.wait_until_active(file).await?;
        }

        let response = self
            .client
            .generate_with_file(&self.model, &file, prompt)
            .await?;
        Ok(response.content)
    }

    async fn wait_until_active(&self, file: RemoteFile) -> AppResult<RemoteFile> {
        if file.state == FileState::Active {
            return Ok(file);
        }

        let name = file.name;
        poll_until(&self.poll, "media processing", || async {
            let current = self.client.get_file(&name).await?;
            match current.state {
                FileState::Active => Ok(PollStatus::Ready(current)),
                FileState::Failed => Err(AppError::ProviderUnavailable(format!(
                    "Media processing failed for {}",
                    current.name
                ))),
                _ => Ok(PollStatus::Pending),
            }
        })
        .await
    }
}
