//! Legal knowledge base and RAG pipeline.
//!
//! - [`store`]: persistent vector index (JSON file, atomic writes)
//! - [`chunker`] and [`indexer`]: overlapping chunking and document indexing
//! - [`retriever`]: fail-open top-k retrieval
//! - [`rag`]: chat orchestration with degraded fallback
//! - [`analysis`]: structured case analysis
//! - [`context`]: application context wiring providers to components

pub mod analysis;
pub mod chunker;
pub mod context;
pub mod embeddings;
pub mod indexer;
pub mod rag;
pub mod retriever;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use analysis::{CaseAnalysis, CaseAnalyzer, CaseMetadata};
pub use context::AppContext;
pub use embeddings::{create_provider, EmbeddingProvider};
pub use indexer::DocumentIndexer;
pub use rag::{RagOrchestrator, RagResponse, DEGRADED_NOTICE};
pub use retriever::Retriever;
pub use store::VectorStore;
pub use types::{IndexReport, IndexStatus, IndexedChunk, ScoredChunk, StoreStats};
