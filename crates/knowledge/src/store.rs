//! Persistent vector index over legal text chunks.
//!
//! The whole index lives in one JSON file. Every handle opened on the same
//! file shares one in-memory state, so writers are serialized per index path;
//! readers work on an immutable snapshot that is swapped only after the new
//! state has been persisted.

use crate::embeddings::EmbeddingProvider;
use crate::types::{IndexedChunk, ScoredChunk, StoreStats};
use lexcase_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock, Weak};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Bumped whenever the persisted layout changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Text of the seed entry written into a fresh index.
pub const PLACEHOLDER_TEXT: &str = "Initial setup";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    embedding: Vec<f32>,
    chunk: IndexedChunk,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    schema_version: u32,
    embedding_model: String,
    dimensions: usize,
    entries: Vec<StoredEntry>,
}

type Snapshot = Arc<Vec<StoredEntry>>;

/// State shared by all handles on one index file.
struct IndexState {
    embedding_model: String,
    dimensions: usize,
    snapshot: RwLock<Snapshot>,
    writer: Mutex<()>,
}

type Registry = Mutex<HashMap<PathBuf, Weak<IndexState>>>;

/// Open indexes keyed by canonical path. Held while a file is loaded or
/// seeded, never across a remote call.
fn registry() -> &'static Registry {
    static OPEN_INDEXES: OnceLock<Registry> = OnceLock::new();
    OPEN_INDEXES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Append-only vector index bound to one file and one embedding provider.
pub struct VectorStore {
    path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    state: Arc<IndexState>,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("path", &self.path)
            .field("entries", &self.len())
            .finish()
    }
}

impl VectorStore {
    /// Open the index at `path`, or create a fresh seeded one.
    ///
    /// Any problem with the persisted copy (missing, unreadable, corrupt,
    /// other schema version, other embedding model or dimension) leads to a
    /// fresh index that is written immediately. Errors only when the seed
    /// cannot be embedded or written.
    ///
    /// A file that is already open in this process is not reloaded: the new
    /// handle joins the open state, and all of its writes go through the
    /// same writer lock. Joining with a different embedding model or
    /// dimension is an `IndexUnavailable` error.
    pub async fn load_or_init(
        path: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        let path = path.into();
        let key = registry_key(&path).await;

        {
            let mut open = registry().lock().await;
            open.retain(|_, state| state.strong_count() > 0);
            if let Some(store) = Self::join_open(&open, &key, &path, &embedder)? {
                return Ok(store);
            }

            match load_entries(&path, embedder.as_ref()).await {
                Ok(entries) => {
                    info!(
                        "Loaded vector index from {} ({} entries)",
                        path.display(),
                        entries.len()
                    );
                    let store = Self::from_entries(path, embedder, entries);
                    open.insert(key, Arc::downgrade(&store.state));
                    return Ok(store);
                }
                Err(reason) => {
                    if path.exists() {
                        warn!("Rebuilding vector index at {}: {}", path.display(), reason);
                    } else {
                        info!("Creating vector index at {}", path.display());
                    }
                }
            }
        }

        // The seed is embedded with the registry unlocked
        let embedding = embedder.embed(PLACEHOLDER_TEXT).await?;
        check_dimensions(&embedding, embedder.dimensions())?;

        let mut open = registry().lock().await;
        // Another handle may have opened the path meanwhile
        if let Some(store) = Self::join_open(&open, &key, &path, &embedder)? {
            return Ok(store);
        }

        let seed = StoredEntry {
            embedding,
            chunk: IndexedChunk::new(
                "placeholder",
                PLACEHOLDER_TEXT,
                serde_json::json!({ "placeholder": true }),
            ),
        };
        let entries = vec![seed];
        persist(&path, embedder.as_ref(), &entries).await?;

        let store = Self::from_entries(path, embedder, entries);
        open.insert(key, Arc::downgrade(&store.state));
        Ok(store)
    }

    /// A new handle on the state already open under `key`, if any.
    fn join_open(
        open: &HashMap<PathBuf, Weak<IndexState>>,
        key: &Path,
        path: &Path,
        embedder: &Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Option<Self>> {
        let Some(state) = open.get(key).and_then(Weak::upgrade) else {
            return Ok(None);
        };

        if state.embedding_model != embedder.model_name()
            || state.dimensions != embedder.dimensions()
        {
            return Err(AppError::IndexUnavailable(format!(
                "{} is already open with embedding model '{}' ({} dimensions)",
                path.display(),
                state.embedding_model,
                state.dimensions
            )));
        }

        debug!("Joining open vector index at {}", path.display());
        Ok(Some(Self {
            path: path.to_path_buf(),
            embedder: Arc::clone(embedder),
            state,
        }))
    }

    fn from_entries(
        path: PathBuf,
        embedder: Arc<dyn EmbeddingProvider>,
        entries: Vec<StoredEntry>,
    ) -> Self {
        let state = Arc::new(IndexState {
            embedding_model: embedder.model_name().to_string(),
            dimensions: embedder.dimensions(),
            snapshot: RwLock::new(Arc::new(entries)),
            writer: Mutex::new(()),
        });
        Self {
            path,
            embedder,
            state,
        }
    }

    /// Embed and append `chunks`, then persist the full index.
    ///
    /// On error neither the file nor the in-memory index changes.
    pub async fn add(&self, chunks: Vec<IndexedChunk>) -> AppResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }
        for embedding in &embeddings {
            check_dimensions(embedding, self.embedder.dimensions())?;
        }

        let _guard = self.state.writer.lock().await;

        let current = self.snapshot();
        let mut next = Vec::with_capacity(current.len() + chunks.len());
        next.extend(current.iter().cloned());
        next.extend(
            embeddings
                .into_iter()
                .zip(chunks)
                .map(|(embedding, chunk)| StoredEntry { embedding, chunk }),
        );

        persist(&self.path, self.embedder.as_ref(), &next).await?;

        let added = next.len() - current.len();
        self.swap(Arc::new(next));
        debug!("Appended {} chunks to {}", added, self.path.display());
        Ok(added)
    }

    /// The `k` most similar non-placeholder chunks, best first.
    pub async fn search(&self, query: &str, k: usize) -> AppResult<Vec<IndexedChunk>> {
        Ok(self
            .search_scored(query, k)
            .await?
            .into_iter()
            .map(|hit| hit.chunk)
            .collect())
    }

    /// Like [`search`](Self::search) but keeps the cosine scores.
    ///
    /// Equal scores keep insertion order.
    pub async fn search_scored(&self, query: &str, k: usize) -> AppResult<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let entries = self.snapshot();

        let mut scored: Vec<(f32, &StoredEntry)> = entries
            .iter()
            .filter(|entry| !entry.chunk.is_placeholder())
            .map(|entry| (cosine_similarity(&query_embedding, &entry.embedding), entry))
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| ScoredChunk {
                chunk: entry.chunk.clone(),
                score,
            })
            .collect())
    }

    /// Total entries, placeholder included.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries excluding placeholders.
    pub fn real_len(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|entry| !entry.chunk.is_placeholder())
            .count()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if a document with this SHA-256 content hash is already indexed.
    pub fn contains_content_hash(&self, hash: &str) -> bool {
        self.snapshot()
            .iter()
            .any(|entry| entry.chunk.content_hash() == Some(hash))
    }

    pub fn stats(&self) -> StoreStats {
        let entries = self.snapshot();
        let documents: HashSet<&str> = entries
            .iter()
            .filter_map(|entry| entry.chunk.source_id())
            .collect();

        StoreStats {
            path: self.path.clone(),
            entries: entries.len(),
            chunks: entries
                .iter()
                .filter(|entry| !entry.chunk.is_placeholder())
                .count(),
            documents: documents.len(),
            embedding_model: self.embedder.model_name().to_string(),
            dimensions: self.embedder.dimensions(),
            file_size_bytes: std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0),
        }
    }

    fn snapshot(&self) -> Snapshot {
        match self.state.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn swap(&self, next: Snapshot) {
        match self.state.snapshot.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

/// Canonical form of `path` for the open-index registry. The parent
/// directory is created first so that a fresh file and its later reopen map
/// to the same key.
async fn registry_key(path: &Path) -> PathBuf {
    if let Ok(canonical) = tokio::fs::canonicalize(path).await {
        return canonical;
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let _ = tokio::fs::create_dir_all(parent).await;

    match (tokio::fs::canonicalize(parent).await, path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn check_dimensions(embedding: &[f32], expected: usize) -> AppResult<()> {
    if embedding.len() != expected {
        return Err(AppError::Knowledge(format!(
            "Embedding has {} dimensions, expected {}",
            embedding.len(),
            expected
        )));
    }
    Ok(())
}

async fn load_entries(path: &Path, embedder: &dyn EmbeddingProvider) -> AppResult<Vec<StoredEntry>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let index: PersistedIndex = serde_json::from_str(&raw)?;

    if index.schema_version != SCHEMA_VERSION {
        return Err(AppError::IndexUnavailable(format!(
            "schema version {} (expected {})",
            index.schema_version, SCHEMA_VERSION
        )));
    }
    if index.embedding_model != embedder.model_name() {
        return Err(AppError::IndexUnavailable(format!(
            "built with embedding model '{}', configured '{}'",
            index.embedding_model,
            embedder.model_name()
        )));
    }
    if index.dimensions != embedder.dimensions() {
        return Err(AppError::IndexUnavailable(format!(
            "{} dimensions, configured {}",
            index.dimensions,
            embedder.dimensions()
        )));
    }
    if index.entries.is_empty() {
        return Err(AppError::IndexUnavailable("no entries".to_string()));
    }
    if index
        .entries
        .iter()
        .any(|entry| entry.embedding.len() != index.dimensions)
    {
        return Err(AppError::IndexUnavailable(
            "entry with wrong vector length".to_string(),
        ));
    }

    Ok(index.entries)
}

/// Write the index to a sibling temp file, fsync, then rename over `path`.
async fn persist(
    path: &Path,
    embedder: &dyn EmbeddingProvider,
    entries: &[StoredEntry],
) -> AppResult<()> {
    #[derive(Serialize)]
    struct PersistedIndexRef<'a> {
        schema_version: u32,
        embedding_model: &'a str,
        dimensions: usize,
        entries: &'a [StoredEntry],
    }

    let body = serde_json::to_vec(&PersistedIndexRef {
        schema_version: SCHEMA_VERSION,
        embedding_model: embedder.model_name(),
        dimensions: embedder.dimensions(),
        entries,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("index.json");
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let write_result = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(err) = write_result {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(AppError::Io(err));
    }

    debug!("Persisted {} entries ({} bytes) to {}", entries.len(), body.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
