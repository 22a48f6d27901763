//! Error types for Lexcase.
//!
//! One enum covers configuration, I/O, provider, index, retrieval and parse
//! failures. Provider failures are split into retryable
//! (`ProviderUnavailable`, `Timeout`) and non-retryable (`Llm`) kinds so the
//! retry policy can tell them apart.

use thiserror::Error;

/// Unified error type for Lexcase.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Provider rejected the request (auth, malformed request, unknown model)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Provider could not be reached or is overloaded (network, 5xx, quota)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A remote call or polling loop exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The vector index could not be loaded, created or persisted
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// Retrieval of context passages failed
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Structured output from a provider could not be parsed
    #[error("Parse failure: {0}")]
    Parse(String),

    /// Knowledge base errors (indexing, chunking)
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether a retry of the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ProviderUnavailable(_) | AppError::Timeout(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::ProviderUnavailable("503".to_string()).is_retryable());
        assert!(AppError::Timeout("generation".to_string()).is_retryable());
        assert!(!AppError::Llm("401 unauthorized".to_string()).is_retryable());
        assert!(!AppError::Parse("bad json".to_string()).is_retryable());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
