//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A stored unit of legal text.
///
/// Identity inside the index is positional; `id` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl IndexedChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
        }
    }

    /// True for the seed entry written when an index is created.
    pub fn is_placeholder(&self) -> bool {
        self.metadata
            .get("placeholder")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn source_id(&self) -> Option<&str> {
        self.metadata.get("source_id").and_then(|v| v.as_str())
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.metadata.get("content_hash").and_then(|v| v.as_str())
    }
}

/// A search hit with its cosine similarity.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: IndexedChunk,
    pub score: f32,
}

/// Outcome of indexing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndexStatus {
    Indexed { chunks: usize },
    /// Input had no indexable content
    Empty,
    Failed { reason: String },
}

impl IndexStatus {
    pub fn is_indexed(&self) -> bool {
        matches!(self, IndexStatus::Indexed { .. })
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexStatus::Indexed { chunks } => {
                write!(f, "Successfully indexed document ({} chunks).", chunks)
            }
            IndexStatus::Empty => write!(f, "Document is empty; nothing indexed."),
            IndexStatus::Failed { reason } => write!(f, "Indexing failed: {}", reason),
        }
    }
}

/// Summary of a multi-file indexing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub documents_indexed: usize,
    pub chunks_added: usize,
    /// Files already present in the index with identical content
    pub unchanged: usize,
    /// Files with no indexable text
    pub empty: usize,
    pub failures: Vec<IndexFailure>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Index statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub path: PathBuf,
    pub entries: usize,
    pub chunks: usize,
    pub documents: usize,
    pub embedding_model: String,
    pub dimensions: usize,
    pub file_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholder_detection() {
        let seed = IndexedChunk::new("seed", "Initial setup", json!({ "placeholder": true }));
        let real = IndexedChunk::new("a-0", "Section 303", json!({ "source_id": "a" }));

        assert!(seed.is_placeholder());
        assert!(!real.is_placeholder());
        assert_eq!(real.source_id(), Some("a"));
    }

    #[test]
    fn test_chunk_without_metadata_deserializes() {
        let chunk: IndexedChunk = serde_json::from_str(r#"{"id":"x","text":"y"}"#).unwrap();
        assert!(chunk.metadata.is_null());
        assert!(!chunk.is_placeholder());
    }

    #[test]
    fn test_status_serialization() {
        let value = serde_json::to_value(IndexStatus::Indexed { chunks: 3 }).unwrap();
        assert_eq!(value, json!({ "status": "indexed", "chunks": 3 }));
    }
}
