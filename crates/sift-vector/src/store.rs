//! The vector store: index, metadata and persistence behind one handle.
//!
//! [`VectorStore`] owns the currently served snapshot (index plus metadata)
//! and the embedding provider used to build and query it. Readers take a
//! cheap `Arc` clone of the snapshot, so a search never observes a
//! half-built store. Rebuilds, saves and loads are serialized by a writer
//! lock; a rebuild embeds the full document set off to the side, persists
//! it, and only then swaps it in. File work runs on the blocking pool.
//!
//! A saved index is only served by the provider that built it: a provider
//! name or vector dimension that differs from the store's embedder makes the
//! pair unusable, and the store starts empty until the next rebuild.
//!
//! # Crash recovery
//!
//! The index file is renamed into place before the metadata file. A crash
//! between the two renames leaves a new index beside old metadata, whose
//! checksum no longer matches. The next start reports the pair as corrupt
//! and serves an empty store; a rebuild (`POST /sync` or `sift index`)
//! writes a consistent pair again.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sift_core::util::paths::expand_tilde;
use sift_core::{Error, Result};
use tokio::sync::Mutex;

use crate::embedding::EmbeddingProvider;
use crate::index::FlatIndex;
use crate::metadata::MetadataStore;
use crate::persistence::{self, BuildInfo, LoadOutcome, PersistedStore};
use crate::types::{BuildOutcome, Document, DocumentMetadata, SearchResult, SkipReason, StoreConfig};

/// Default upper bound on a single embedding call.
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(60);

/// Lifecycle of the served snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Nothing loaded and nothing built.
    Empty,
    /// Restored from disk.
    Loaded,
    /// Built by this process.
    Built,
}

/// What [`VectorStore::load`] found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded { documents: usize },
    Absent,
    Corrupt { reason: String },
}

/// An immutable index/metadata pair.
#[derive(Debug)]
pub struct StoreSnapshot {
    index: FlatIndex,
    metadata: MetadataStore,
    info: Option<BuildInfo>,
    state: StoreState,
}

impl StoreSnapshot {
    fn empty() -> Self {
        Self {
            index: FlatIndex::default(),
            metadata: MetadataStore::new(),
            info: None,
            state: StoreState::Empty,
        }
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    /// Embedding provider that produced the vectors.
    pub fn provider(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.provider.as_str())
    }

    /// Content hash of the documents this snapshot was built from.
    pub fn content_hash(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.content_hash.as_str())
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.info.as_ref().map(|i| i.built_at)
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

/// Semantic document store.
pub struct VectorStore {
    config: StoreConfig,
    index_path: PathBuf,
    metadata_path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    embed_timeout: Duration,
    current: RwLock<Arc<StoreSnapshot>>,
    writer: Mutex<()>,
}

impl VectorStore {
    /// Open a store, restoring the saved snapshot if one is usable.
    ///
    /// Missing, corrupt or foreign files leave the store empty; this never
    /// fails.
    pub fn open(config: StoreConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let store = Self::new(config, embedder);
        let outcome = persistence::load_pair(&store.index_path, &store.metadata_path);
        let (snapshot, status) = store.snapshot_from(outcome);
        store.report_load(&status);
        store.swap(Arc::new(snapshot));
        store
    }

    /// Create an empty store without touching the disk.
    pub fn new(config: StoreConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index_path: expand_tilde(&config.index_path),
            metadata_path: expand_tilde(&config.metadata_path),
            config,
            embedder,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
            current: RwLock::new(Arc::new(StoreSnapshot::empty())),
            writer: Mutex::new(()),
        }
    }

    /// Bound every embedding call by `timeout`.
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// The snapshot currently being served.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn state(&self) -> StoreState {
        self.snapshot().state()
    }

    /// Metadata of the document at `ordinal`.
    pub fn document(&self, ordinal: usize) -> Option<DocumentMetadata> {
        self.snapshot().metadata().get(ordinal).cloned()
    }

    /// Whether the served snapshot was built from exactly `documents` by
    /// this store's embedding provider.
    pub fn is_fresh(&self, documents: &[Document]) -> bool {
        let current = persistence::compute_content_hash(documents);
        let snapshot = self.snapshot();
        snapshot.content_hash() == Some(current.as_str())
            && snapshot.provider() == Some(self.embedder.name())
    }

    // ------------------------------------------------------------------------
    // Build
    // ------------------------------------------------------------------------

    /// Replace the store with an index over `documents`.
    ///
    /// All texts are embedded in one batch call. On success the new snapshot
    /// is saved and then served. When there is nothing to embed, or the
    /// provider cannot deliver one vector per document, the current store is
    /// kept and a [`BuildOutcome::Skipped`] is returned.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidDimension` if the returned vectors disagree in length
    /// - persistence errors from saving; the previous snapshot stays served
    pub async fn build_index_from_documents(
        &self,
        documents: Vec<Document>,
    ) -> Result<BuildOutcome> {
        if documents.is_empty() {
            log::info!("No documents provided to build the index");
            return Ok(BuildOutcome::Skipped(SkipReason::NoDocuments));
        }

        let _guard = self.writer.lock().await;

        let documents: Vec<Document> = if self.embedder.accepts_empty_input() {
            documents
        } else {
            let before = documents.len();
            let kept: Vec<Document> = documents
                .into_iter()
                .filter(|d| !d.text.is_empty())
                .collect();
            if kept.len() < before {
                log::warn!(
                    "Dropped {} documents with empty text before embedding",
                    before - kept.len()
                );
            }
            kept
        };
        if documents.is_empty() {
            return Ok(BuildOutcome::Skipped(SkipReason::NoEmbeddableText));
        }

        log::info!(
            "Generating embeddings for {} documents with {}",
            documents.len(),
            self.embedder.name()
        );
        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let embeddings = match self.embed(&texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                log::warn!("Embedding failed, keeping the current index: {e}");
                return Ok(skipped(e.to_string()));
            }
        };
        if embeddings.is_empty() {
            log::warn!("Embedding provider returned no vectors, keeping the current index");
            return Ok(skipped("embedding provider returned no vectors"));
        }
        if embeddings.len() != documents.len() {
            log::warn!(
                "Embedding provider returned {} vectors for {} documents",
                embeddings.len(),
                documents.len()
            );
            return Ok(skipped(format!(
                "expected {} vectors, got {}",
                documents.len(),
                embeddings.len()
            )));
        }

        for (doc, embedding) in documents.iter().zip(&embeddings) {
            log::debug!(
                "Indexed '{}': {:?} -> {:?}",
                doc.title,
                doc.text.chars().take(70).collect::<String>(),
                &embedding[..embedding.len().min(5)]
            );
        }

        let index = FlatIndex::build(embeddings)?;
        let metadata =
            MetadataStore::from_records(documents.iter().map(Document::metadata).collect());
        let info = BuildInfo {
            provider: self.embedder.name().to_string(),
            content_hash: persistence::compute_content_hash(&documents),
            built_at: Utc::now(),
        };

        let outcome = BuildOutcome::Built {
            documents: metadata.len(),
            dimension: index.dimension(),
        };
        let snapshot = Arc::new(StoreSnapshot {
            index,
            metadata,
            info: Some(info.clone()),
            state: StoreState::Built,
        });
        self.persist(snapshot.clone(), info).await?;

        self.swap(snapshot);
        log::info!("Index rebuilt with {} documents", documents.len());
        Ok(outcome)
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        tokio::time::timeout(self.embed_timeout, self.embedder.embed_batch(texts))
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "embedding did not finish within {:?}",
                    self.embed_timeout
                ))
            })?
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Find the `k` documents most similar to `query_text`.
    ///
    /// Results are ordered by descending cosine similarity. An empty store,
    /// `k == 0`, or an unavailable embedding provider yield an empty list.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` for an empty query
    /// - `Error::InvalidDimension` if the query embedding does not match the index
    pub async fn search(&self, query_text: &str, k: usize) -> Result<Vec<SearchResult>> {
        if query_text.trim().is_empty() {
            return Err(Error::invalid_input("Query cannot be empty."));
        }

        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            log::info!("Vector store is empty; nothing to search");
            return Ok(Vec::new());
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = match self.embed(&[query_text]).await {
            Ok(mut vectors) if vectors.len() == 1 => vectors.remove(0),
            Ok(vectors) => {
                log::warn!(
                    "Query embedding unavailable ({} vectors returned)",
                    vectors.len()
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                log::warn!("Query embedding failed: {e}");
                return Ok(Vec::new());
            }
        };

        let hits = snapshot.index().search(&query, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|(ordinal, similarity_score)| {
                snapshot
                    .metadata()
                    .get(ordinal)
                    .map(|document| SearchResult {
                        document: document.clone(),
                        similarity_score,
                    })
            })
            .collect())
    }

    // ------------------------------------------------------------------------
    // Save / load
    // ------------------------------------------------------------------------

    /// Write the served snapshot to disk.
    pub async fn save(&self) -> Result<()> {
        let _guard = self.writer.lock().await;
        let snapshot = self.snapshot();
        let info = snapshot.info.clone().unwrap_or_else(|| BuildInfo {
            provider: self.embedder.name().to_string(),
            content_hash: persistence::compute_content_hash(&[]),
            built_at: Utc::now(),
        });
        self.persist(snapshot, info).await
    }

    /// Replace the served snapshot with what is on disk.
    ///
    /// Missing, corrupt or foreign files reset the store to empty.
    pub async fn load(&self) -> LoadStatus {
        let _guard = self.writer.lock().await;
        let index_path = self.index_path.clone();
        let metadata_path = self.metadata_path.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            persistence::load_pair(&index_path, &metadata_path)
        })
        .await
        .unwrap_or_else(|e| LoadOutcome::Corrupt(format!("load task failed: {e}")));

        let (snapshot, status) = self.snapshot_from(outcome);
        self.report_load(&status);
        self.swap(Arc::new(snapshot));
        status
    }

    async fn persist(&self, snapshot: Arc<StoreSnapshot>, info: BuildInfo) -> Result<()> {
        let index_path = self.index_path.clone();
        let metadata_path = self.metadata_path.clone();
        tokio::task::spawn_blocking(move || {
            persistence::save_pair(
                snapshot.index(),
                snapshot.metadata(),
                &info,
                &index_path,
                &metadata_path,
            )
        })
        .await
        .map_err(|e| Error::operation(format!("save task failed: {e}")))?
    }

    fn snapshot_from(&self, outcome: LoadOutcome) -> (StoreSnapshot, LoadStatus) {
        match outcome {
            LoadOutcome::Loaded(stored) => {
                if let Some(reason) = self.incompatibility(&stored) {
                    return (StoreSnapshot::empty(), LoadStatus::Corrupt { reason });
                }
                let status = LoadStatus::Loaded {
                    documents: stored.metadata.len(),
                };
                let snapshot = StoreSnapshot {
                    index: stored.index,
                    metadata: stored.metadata,
                    info: Some(stored.info),
                    state: StoreState::Loaded,
                };
                (snapshot, status)
            }
            LoadOutcome::Absent => (StoreSnapshot::empty(), LoadStatus::Absent),
            LoadOutcome::Corrupt(reason) => {
                (StoreSnapshot::empty(), LoadStatus::Corrupt { reason })
            }
        }
    }

    /// Why a stored pair cannot be queried with this store's embedder.
    fn incompatibility(&self, stored: &PersistedStore) -> Option<String> {
        let provider = self.embedder.name();
        if stored.info.provider != provider {
            return Some(format!(
                "index was built by '{}' but the store embeds with '{provider}'",
                stored.info.provider
            ));
        }
        let expected = self.embedder.dimension();
        if expected != 0 && !stored.index.is_empty() && stored.index.dimension() != expected {
            return Some(
                Error::InvalidDimension {
                    expected,
                    actual: stored.index.dimension(),
                }
                .to_string(),
            );
        }
        None
    }

    fn report_load(&self, status: &LoadStatus) {
        match status {
            LoadStatus::Loaded { documents } => log::info!(
                "Loaded {documents} documents from {}",
                self.index_path.display()
            ),
            LoadStatus::Absent => {
                log::info!("No saved index found, starting with an empty store")
            }
            LoadStatus::Corrupt { reason } => {
                log::warn!("Saved index is unusable ({reason}), starting with an empty store")
            }
        }
    }

    fn swap(&self, snapshot: Arc<StoreSnapshot>) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = snapshot;
    }
}

fn skipped(reason: impl Into<String>) -> BuildOutcome {
    BuildOutcome::Skipped(SkipReason::EmbeddingsUnavailable(reason.into()))
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("index_path", &self.index_path)
            .field("metadata_path", &self.metadata_path)
            .field("embedder", &self.embedder.name())
            .field("documents", &self.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use tempfile::{TempDir, tempdir};

    fn config_in(dir: &TempDir) -> StoreConfig {
        StoreConfig {
            index_path: dir.path().join("vector_store.idx").to_string_lossy().into_owned(),
            metadata_path: dir.path().join("metadata.json").to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    fn docs() -> Vec<Document> {
        vec![
            Document::new("disk.md", "database outage disk full").with_title("Disk"),
            Document::new("login.md", "login page typo").with_title("Login"),
        ]
    }

    #[tokio::test]
    async fn test_open_without_files_is_empty() {
        let dir = tempdir().unwrap();
        let store = VectorStore::open(config_in(&dir), Arc::new(MockEmbeddingProvider::new(32)));

        assert!(store.is_empty());
        assert_eq!(store.state(), StoreState::Empty);
    }

    #[tokio::test]
    async fn test_build_then_search() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(config_in(&dir), Arc::new(MockEmbeddingProvider::new(128)));

        let outcome = store.build_index_from_documents(docs()).await.unwrap();
        assert_eq!(
            outcome,
            BuildOutcome::Built {
                documents: 2,
                dimension: 128
            }
        );
        assert_eq!(store.state(), StoreState::Built);

        let results = store.search("disk full", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "disk.md");
    }

    #[tokio::test]
    async fn test_build_uses_single_batch_call() {
        let dir = tempdir().unwrap();
        let embedder = Arc::new(MockEmbeddingProvider::new(16));
        let store = VectorStore::new(config_in(&dir), embedder.clone());

        store.build_index_from_documents(docs()).await.unwrap();
        assert_eq!(embedder.batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(config_in(&dir), Arc::new(MockEmbeddingProvider::new(16)));

        let err = store.search("   ", 3).await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_k_zero_skips_embedding() {
        let dir = tempdir().unwrap();
        let embedder = Arc::new(MockEmbeddingProvider::new(16));
        let store = VectorStore::new(config_in(&dir), embedder.clone());
        store.build_index_from_documents(docs()).await.unwrap();

        assert!(store.search("disk", 0).await.unwrap().is_empty());
        assert_eq!(embedder.batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_dropped_when_provider_rejects_it() {
        let dir = tempdir().unwrap();
        let embedder = Arc::new(MockEmbeddingProvider::new(16).rejecting_empty_input());
        let store = VectorStore::new(config_in(&dir), embedder);

        let mut input = docs();
        input.push(Document::new("blank.md", ""));
        store.build_index_from_documents(input).await.unwrap();
        assert_eq!(store.len(), 2);

        let outcome = store
            .build_index_from_documents(vec![Document::new("blank.md", "")])
            .await
            .unwrap();
        assert_eq!(outcome, BuildOutcome::Skipped(SkipReason::NoEmbeddableText));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_text_kept_when_provider_accepts_it() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(config_in(&dir), Arc::new(MockEmbeddingProvider::new(16)));

        let mut input = docs();
        input.push(Document::new("blank.md", ""));
        store.build_index_from_documents(input).await.unwrap();
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_is_fresh() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(config_in(&dir), Arc::new(MockEmbeddingProvider::new(16)));
        assert!(!store.is_fresh(&docs()));

        store.build_index_from_documents(docs()).await.unwrap();
        assert!(store.is_fresh(&docs()));
        assert!(!store.is_fresh(&docs()[..1]));
    }

    #[tokio::test]
    async fn test_reopen_with_other_dimension_starts_empty() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(config_in(&dir), Arc::new(MockEmbeddingProvider::new(16)));
        store.build_index_from_documents(docs()).await.unwrap();

        let wider = VectorStore::open(config_in(&dir), Arc::new(MockEmbeddingProvider::new(32)));
        assert!(wider.is_empty());
        assert!(!wider.is_fresh(&docs()));
        assert!(matches!(wider.load().await, LoadStatus::Corrupt { .. }));
        assert!(wider.search("disk full", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_document_lookup() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(config_in(&dir), Arc::new(MockEmbeddingProvider::new(16)));
        store.build_index_from_documents(docs()).await.unwrap();

        assert_eq!(store.document(1).unwrap().title, "Login");
        assert!(store.document(2).is_none());
    }
}
