//! Lexcase Core Library
//!
//! This crate provides the foundational utilities shared by every Lexcase crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (providers, RAG tuning, retry policies)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, RetryConfig};
pub use error::{AppError, AppResult};
