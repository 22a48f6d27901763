//! LLM integration crate for Lexcase.
//!
//! This crate provides a provider-agnostic abstraction for text generation
//! with conversation history, a retry policy shared by every remote call, and
//! the media-analysis path (file upload plus bounded polling).
//!
//! # Providers
//! - **Gemini**: hosted multimodal model (default)
//! - **Ollama**: local runtime, useful for offline development
//!
//! # Example
//! ```no_run
//! use lexcase_llm::{LlmClient, LlmRequest, providers::GeminiClient, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new("api-key", None, 60, RetryPolicy::default())?;
//! let request = LlmRequest::new("Which section covers theft?", "gemini-flash-latest");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod http;
pub mod media;
pub mod providers;
pub mod retry;

// Re-export main types
pub use client::{ChatRole, ChatTurn, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_gemini_client, DisabledClient};
pub use media::{MediaAnalyzer, PollPolicy};
pub use providers::{GeminiClient, OllamaClient};
pub use retry::RetryPolicy;
