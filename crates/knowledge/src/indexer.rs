//! Document indexing: chunk, tag with source metadata, append to the store.

use crate::chunker;
use crate::store::VectorStore;
use crate::types::{IndexFailure, IndexReport, IndexStatus, IndexedChunk};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Extensions picked up by [`DocumentIndexer::index_paths`] when none are given.
pub const DEFAULT_EXTENSIONS: &[&str] = &["txt", "md"];

pub const NOT_INITIALIZED: &str = "Vector index not initialized";

/// Indexes legal text into a [`VectorStore`].
#[derive(Debug, Clone)]
pub struct DocumentIndexer {
    store: Option<Arc<VectorStore>>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentIndexer {
    pub fn new(store: Option<Arc<VectorStore>>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            store,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Chunk and index one document. Never fails; the outcome is reported
    /// in the returned status.
    pub async fn index_document(&self, text: &str, source: &str) -> IndexStatus {
        let Some(store) = &self.store else {
            tracing::warn!("Cannot index '{}': {}", source, NOT_INITIALIZED);
            return IndexStatus::Failed {
                reason: NOT_INITIALIZED.to_string(),
            };
        };

        let pieces = chunker::chunk(text, self.chunk_size, self.chunk_overlap);
        if pieces.is_empty() {
            tracing::debug!("Skipping empty document '{}'", source);
            return IndexStatus::Empty;
        }

        let chunks = build_chunks(pieces, source, &content_hash(text));
        let count = chunks.len();

        match store.add(chunks).await {
            Ok(added) => {
                tracing::info!("Indexed '{}' ({} chunks)", source, added);
                IndexStatus::Indexed { chunks: added }
            }
            Err(err) => {
                tracing::warn!("Failed to index '{}' ({} chunks): {}", source, count, err);
                IndexStatus::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Index files and directory trees.
    ///
    /// Only UTF-8 files whose extension is in `extensions` are read (all of
    /// [`DEFAULT_EXTENSIONS`] when empty). Files whose content is already in
    /// the index are skipped.
    pub async fn index_paths(&self, paths: &[PathBuf], extensions: &[String]) -> IndexReport {
        let start = Instant::now();
        let mut report = IndexReport::default();

        let extensions: Vec<String> = if extensions.is_empty() {
            DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
        } else {
            extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect()
        };

        for root in paths {
            if !root.exists() {
                report.failures.push(IndexFailure {
                    path: root.clone(),
                    reason: "Path does not exist".to_string(),
                });
                continue;
            }

            for entry in WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && has_extension(path, &extensions) {
                    self.index_file(path, &mut report).await;
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Indexing completed: {} documents, {} chunks, {} unchanged, {} failures in {}ms",
            report.documents_indexed,
            report.chunks_added,
            report.unchanged,
            report.failures.len(),
            report.duration_ms
        );
        report
    }

    async fn index_file(&self, path: &Path, report: &mut IndexReport) {
        tracing::debug!("Processing file: {:?}", path);

        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(err) => {
                report.failures.push(IndexFailure {
                    path: path.to_path_buf(),
                    reason: format!("Failed to read file: {}", err),
                });
                return;
            }
        };

        if let Some(store) = &self.store {
            if store.contains_content_hash(&content_hash(&text)) {
                tracing::debug!("Unchanged, skipping: {:?}", path);
                report.unchanged += 1;
                return;
            }
        }

        match self.index_document(&text, &path.display().to_string()).await {
            IndexStatus::Indexed { chunks } => {
                report.documents_indexed += 1;
                report.chunks_added += chunks;
            }
            IndexStatus::Empty => report.empty += 1,
            IndexStatus::Failed { reason } => report.failures.push(IndexFailure {
                path: path.to_path_buf(),
                reason,
            }),
        }
    }
}

fn build_chunks(pieces: Vec<String>, source: &str, content_hash: &str) -> Vec<IndexedChunk> {
    let source_id = uuid::Uuid::new_v4().to_string();
    let indexed_at = Utc::now().to_rfc3339();
    let total = pieces.len();

    pieces
        .into_iter()
        .enumerate()
        .map(|(position, text)| {
            IndexedChunk::new(
                format!("{}-{}", source_id, position),
                text,
                serde_json::json!({
                    "source_id": source_id,
                    "source": source,
                    "position": position,
                    "chunk_count": total,
                    "content_hash": content_hash,
                    "indexed_at": indexed_at,
                }),
            )
        })
        .collect()
}

/// Hex SHA-256 of a document.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_build_chunks_metadata() {
        let chunks = build_chunks(
            vec!["first".to_string(), "second".to_string()],
            "bns.txt",
            "abc",
        );

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].metadata["position"], 1);
        assert_eq!(chunks[1].metadata["source"], "bns.txt");
        assert_eq!(chunks[0].source_id(), chunks[1].source_id());
        assert!(chunks[0].id.ends_with("-0"));
    }

    #[test]
    fn test_has_extension() {
        let exts = vec!["txt".to_string()];
        assert!(has_extension(Path::new("a/b.TXT"), &exts));
        assert!(!has_extension(Path::new("a/b.pdf"), &exts));
        assert!(!has_extension(Path::new("a/README"), &exts));
    }

    #[tokio::test]
    async fn test_uninitialized_store_fails() {
        let indexer = DocumentIndexer::new(None, 500, 50);
        let status = indexer.index_document("Section 303 covers theft.", "x").await;
        assert_eq!(
            status,
            IndexStatus::Failed {
                reason: NOT_INITIALIZED.to_string()
            }
        );
    }
}
