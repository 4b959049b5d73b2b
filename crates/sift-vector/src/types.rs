//! Common types for the vector store.
//!
//! These types are shared by the index, the persistence layer, the
//! orchestrating [`VectorStore`](crate::VectorStore) and the document sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Configuration
// ============================================================================

/// Storage configuration for a vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the binary vector index file.
    pub index_path: String,

    /// Path to the JSON metadata file.
    pub metadata_path: String,

    /// Result count used when a search request does not specify one.
    pub default_k: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            index_path: "vector_store.idx".to_string(),
            metadata_path: "metadata.json".to_string(),
            default_k: 3,
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding provider: "fastembed" or "mock".
    pub provider: String,

    /// Embedding model name (e.g., "all-minilm-l6-v2").
    pub model: String,

    /// Embedding dimension for the mock provider.
    pub dimension: usize,

    /// Path to cache directory for embedding models.
    pub cache_path: Option<String>,

    /// Upper bound for a single embedding call, in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fastembed".to_string(),
            model: "all-minilm-l6-v2".to_string(),
            dimension: 384,
            cache_path: None,
            timeout_secs: 60,
        }
    }
}

impl EmbeddingConfig {
    /// The embedding timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The name the configured provider records in saved metadata.
    ///
    /// Matches [`EmbeddingProvider::name`](crate::EmbeddingProvider::name)
    /// of the provider built from this config, without loading a model.
    pub fn provider_name(&self) -> String {
        match self.provider.as_str() {
            "mock" => format!("mock-{}", self.dimension),
            "fastembed" => self.model.clone(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// Documents
// ============================================================================

/// A raw document handed to the store for indexing.
///
/// Documents are transient: only their [`DocumentMetadata`] survives a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier.
    pub id: String,

    /// Human-readable title.
    pub title: String,

    /// Where the document came from (e.g. `local_file://disk_full.md`).
    pub origin_uri: String,

    /// Last modification time reported by the source.
    pub last_modified: DateTime<Utc>,

    /// Text to be embedded.
    pub text: String,
}

impl Document {
    /// Create a document whose title defaults to its id.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            origin_uri: String::new(),
            last_modified: Utc::now(),
            text: text.into(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the origin URI.
    pub fn with_origin_uri(mut self, origin_uri: impl Into<String>) -> Self {
        self.origin_uri = origin_uri.into();
        self
    }

    /// Set the last modification time.
    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// The identifying metadata that is kept after embedding.
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            id: self.id.clone(),
            title: self.title.clone(),
            origin_uri: self.origin_uri.clone(),
            last_modified: self.last_modified,
        }
    }
}

/// Persisted descriptor of an indexed document.
///
/// The text is dropped once embedded; only identity survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Unique document identifier.
    pub id: String,

    /// Human-readable title.
    pub title: String,

    /// Where the document came from.
    #[serde(alias = "url")]
    pub origin_uri: String,

    /// Last modification time reported by the source.
    pub last_modified: DateTime<Utc>,
}

impl From<&Document> for DocumentMetadata {
    fn from(document: &Document) -> Self {
        document.metadata()
    }
}

// ============================================================================
// Search and build results
// ============================================================================

/// A single search hit joined with its document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matching document.
    pub document: DocumentMetadata,

    /// Cosine similarity in `[-1, 1]`, higher is more similar.
    pub similarity_score: f32,
}

/// Result of a rebuild request.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// The index was rebuilt and persisted.
    Built {
        /// Number of documents now in the store.
        documents: usize,
        /// Embedding dimension of the new index.
        dimension: usize,
    },

    /// Nothing changed; the previous store is still being served.
    Skipped(SkipReason),
}

impl BuildOutcome {
    /// Whether the store was replaced.
    pub fn is_built(&self) -> bool {
        matches!(self, Self::Built { .. })
    }
}

/// Why a rebuild left the store untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The document list was empty.
    NoDocuments,

    /// Every document had empty text and the provider rejects empty input.
    NoEmbeddableText,

    /// The embedding provider failed, timed out, or returned malformed output.
    EmbeddingsUnavailable(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDocuments => write!(f, "no documents provided"),
            Self::NoEmbeddableText => write!(f, "documents have no text to embed"),
            Self::EmbeddingsUnavailable(reason) => {
                write!(f, "embeddings unavailable: {reason}")
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
