//! Generation provider implementations.

pub mod gemini;
pub mod ollama;

pub use gemini::{FileState, GeminiClient, RemoteFile};
pub use ollama::OllamaClient;
