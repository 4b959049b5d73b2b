//! Semantic document store for Sift.
//!
//! This crate turns a set of documents into an exact cosine-similarity index,
//! answers top-k queries against it, and persists it across restarts.
//!
//! # Features
//!
//! - `fastembed`: Enable local embedding generation via fastembed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        sift-vector                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  VectorStore (build / search / save / load orchestration)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FlatIndex (normalized rows, exhaustive cosine top-k)       │
//! │  MetadataStore (ordinal -> DocumentMetadata)                │
//! │  Persistence (binary index + JSON envelope, checksums)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider trait                                    │
//! │  ├── MockEmbeddingProvider (always available)               │
//! │  └── FastEmbedProvider (feature: fastembed)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  DocumentSource trait                                       │
//! │  ├── LocalDirectorySource                                   │
//! │  └── StaticDocumentSource                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use sift_vector::{Document, MockEmbeddingProvider, StoreConfig, VectorStore};
//! use std::sync::Arc;
//!
//! let store = VectorStore::open(StoreConfig::default(), Arc::new(MockEmbeddingProvider::new(384)));
//! store
//!     .build_index_from_documents(vec![Document::new("disk.md", "DB outage due to disk full")])
//!     .await?;
//!
//! for hit in store.search("disk space issue", 3).await? {
//!     println!("{}: {:.3}", hit.document.title, hit.similarity_score);
//! }
//! ```

pub mod embedding;
pub mod index;
pub mod metadata;
pub mod persistence;
pub mod source;
pub mod store;
pub mod types;

#[cfg(feature = "fastembed")]
pub mod fastembed;

pub use embedding::{EmbeddingProvider, MockEmbeddingProvider, create_embedding_provider};
pub use index::{FlatIndex, normalize};
pub use metadata::MetadataStore;
pub use persistence::{LoadOutcome, compute_content_hash, is_index_fresh};
pub use source::{DocumentSource, LocalDirectorySource, StaticDocumentSource};
pub use store::{LoadStatus, StoreSnapshot, StoreState, VectorStore};
pub use types::{
    BuildOutcome, Document, DocumentMetadata, EmbeddingConfig, SearchResult, SkipReason,
    StoreConfig,
};

#[cfg(feature = "fastembed")]
pub use crate::fastembed::FastEmbedProvider;
