//! Embedding provider trait and mock implementation.
//!
//! This module defines the `EmbeddingProvider` trait that abstracts over
//! embedding generation backends, plus a factory that picks one from
//! configuration.
//!
//! # Providers
//!
//! - `MockEmbeddingProvider`: Deterministic bag-of-words vectors for testing
//! - `FastEmbedProvider`: Local embedding via fastembed (requires `fastembed` feature)

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sift_core::{Error, Result};

use crate::index::normalize;
use crate::types::EmbeddingConfig;

/// Trait for generating text embeddings.
///
/// Implementations wrap specific embedding libraries and provide a uniform
/// async interface. The trait requires `Send + Sync` to allow safe sharing
/// across async tasks.
///
/// A batch call returns exactly one vector per input text, in input order.
/// A provider that cannot produce embeddings may either return an error or
/// an empty list; the store treats both as "embeddings unavailable".
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts.
    ///
    /// Default implementation calls `embed` for each text sequentially.
    /// Backends that support native batching should override this.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The embedding dimension.
    fn dimension(&self) -> usize;

    /// The provider name for diagnostics.
    fn name(&self) -> &str;

    /// Whether empty strings may be sent to the provider.
    ///
    /// When `false`, the store drops empty-text documents before embedding.
    fn accepts_empty_input(&self) -> bool {
        true
    }
}

// ============================================================================
// Mock provider
// ============================================================================

/// A mock embedding provider for testing.
///
/// Each lowercase alphanumeric token is hashed into one slot of the output
/// vector, so texts sharing words land close together. Output is
/// unit-normalized; empty text yields the zero vector. The provider name
/// carries the dimension (`mock-64`), so indexes built at one width are
/// recognised as foreign by a store running another.
#[derive(Debug)]
pub struct MockEmbeddingProvider {
    name: String,
    dimension: usize,
    unavailable: bool,
    accepts_empty: bool,
    batch_calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    /// Create a new mock provider with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            name: format!("mock-{dimension}"),
            dimension,
            unavailable: false,
            accepts_empty: true,
            batch_calls: AtomicUsize::new(0),
        }
    }

    /// A provider that behaves like a failed backend and returns no vectors.
    pub fn unavailable(dimension: usize) -> Self {
        Self {
            unavailable: true,
            ..Self::new(dimension)
        }
    }

    /// Report that empty strings must not be embedded.
    pub fn rejecting_empty_input(mut self) -> Self {
        self.accepts_empty = false;
        self
    }

    /// Number of `embed_batch` calls served so far.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return embedding;
        }

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = blake3::hash(token.to_lowercase().as_bytes());
            let bytes = hash.as_bytes();
            let mut slot_bytes = [0u8; 8];
            slot_bytes.copy_from_slice(&bytes[..8]);
            let slot = (u64::from_le_bytes(slot_bytes) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[slot] += sign;
        }

        normalize(&embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.unavailable {
            return Err(Error::embedding("mock provider is unavailable"));
        }
        Ok(self.deterministic_embedding(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Ok(Vec::new());
        }
        Ok(texts
            .iter()
            .map(|t| self.deterministic_embedding(t))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_empty_input(&self) -> bool {
        self.accepts_empty
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Create an embedding provider from configuration.
///
/// # Errors
///
/// Returns `Error::Config` for an unknown provider name, a zero mock
/// dimension, or a provider whose feature was not compiled in.
pub fn create_embedding_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "mock" => {
            if config.dimension == 0 {
                return Err(Error::config("Embedding dimension must be greater than 0"));
            }
            Ok(Arc::new(MockEmbeddingProvider::new(config.dimension)))
        }
        #[cfg(feature = "fastembed")]
        "fastembed" => {
            let provider = crate::fastembed::FastEmbedProvider::new(
                &config.model,
                config.cache_path.as_deref(),
            )?;
            Ok(Arc::new(provider))
        }
        #[cfg(not(feature = "fastembed"))]
        "fastembed" => Err(Error::config(
            "Embedding provider 'fastembed' requires building with the `fastembed` feature",
        )),
        other => Err(Error::config(format!(
            "Unknown embedding provider: '{other}'. Supported: fastembed, mock"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
