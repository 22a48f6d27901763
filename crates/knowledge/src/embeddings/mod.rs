//! Embedding providers for the legal index.
//!
//! Every vector in one index comes from the same provider and model; the
//! store records both and rebuilds when they change.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, DisabledEmbedder, EmbeddingProvider};
pub use providers::gemini::GeminiEmbeddingProvider;
pub use providers::mock::MockProvider;
