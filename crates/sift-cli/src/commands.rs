//! Handlers for the store-facing commands: serve, index, search, analyze
//! and health.
//!
//! Each handler takes the loaded [`SiftConfig`], wires the components it
//! needs, and returns the text to print.

use std::fmt::Write as _;
use std::sync::Arc;

use sift_analysis::{IncidentAnalysis, create_analyzer};
use sift_api::AppState;
use sift_core::Result;
use sift_core::util::paths::expand_tilde;
use sift_vector::persistence::load_metadata_file;
use sift_vector::{
    BuildOutcome, DocumentSource, LocalDirectorySource, SearchResult, VectorStore,
    compute_content_hash, create_embedding_provider, is_index_fresh,
};

use crate::config::SiftConfig;

// ============================================================================
// Wiring
// ============================================================================

/// Open the configured store with the configured embedding provider.
pub fn open_store(config: &SiftConfig) -> Result<Arc<VectorStore>> {
    let embedder = create_embedding_provider(&config.embedding)?;
    let store = VectorStore::open(config.store.clone(), embedder)
        .with_embed_timeout(config.embedding.timeout());
    Ok(Arc::new(store))
}

/// The local incident directory.
pub fn open_source(config: &SiftConfig) -> Result<LocalDirectorySource> {
    LocalDirectorySource::new(expand_tilde(&config.source.data_path))
}

// ============================================================================
// Command handlers
// ============================================================================

/// Run the HTTP API until Ctrl-C.
pub async fn serve(config: &SiftConfig, port: Option<u16>) -> Result<()> {
    let addr = config.server.socket_addr(port)?;
    let store = open_store(config)?;
    let source = open_source(config)?;
    let analyzer = create_analyzer(&config.analysis)?;

    tracing::info!(
        documents = store.len(),
        source = %source.data_path().display(),
        embedder = store.embedder().name(),
        "starting sift server"
    );

    let state = AppState::new(store, Arc::new(source), Arc::new(analyzer))
        .with_allowed_origins(config.server.allowed_origins.clone());
    sift_api::serve(state, addr).await
}

/// Rebuild the index from the local directory, or with `check` only report
/// whether the saved index matches it and the configured embedding provider.
pub async fn index(config: &SiftConfig, check: bool) -> Result<String> {
    let source = open_source(config)?;
    let documents = source.fetch_documents().await?;

    if check {
        let metadata_path = expand_tilde(&config.store.metadata_path);
        let fresh = is_index_fresh(
            &metadata_path,
            &compute_content_hash(&documents),
            &config.embedding.provider_name(),
        );
        return Ok(if fresh {
            format!("Index is up to date ({} documents).", documents.len())
        } else {
            format!(
                "Index is stale: {} documents in {} do not match the saved index or provider.",
                documents.len(),
                source.data_path().display()
            )
        });
    }

    if documents.is_empty() {
        return Ok(format!(
            "No documents found in {}. The index was not changed.",
            source.data_path().display()
        ));
    }

    let store = open_store(config)?;
    Ok(match store.build_index_from_documents(documents).await? {
        BuildOutcome::Built {
            documents,
            dimension,
        } => format!("Rebuilt index with {documents} pages (dimension {dimension})."),
        BuildOutcome::Skipped(reason) => {
            tracing::warn!(%reason, "index left unchanged");
            format!("Index not rebuilt: {reason}.")
        }
    })
}

/// Search the saved index.
pub async fn search(config: &SiftConfig, query: &str, k: Option<usize>) -> Result<String> {
    let store = open_store(config)?;
    let k = k.unwrap_or(config.store.default_k);
    let results = store.search(query, k).await?;
    Ok(format_results(query, &results))
}

/// Classify incident text.
pub async fn analyze(config: &SiftConfig, text: &str) -> Result<String> {
    let analyzer = create_analyzer(&config.analysis)?;
    let analysis: IncidentAnalysis = analyzer.analyze(text).await?;
    Ok(serde_json::to_string_pretty(&analysis)?)
}

/// Describe the saved index without loading vectors or an embedding model.
pub fn health(config: &SiftConfig) -> String {
    let metadata_path = expand_tilde(&config.store.metadata_path);
    match load_metadata_file(&metadata_path) {
        Ok(meta) => format!(
            "sift: healthy\nindex: {} documents, dimension {}, provider {}, built {}",
            meta.document_count,
            meta.embedding_dimension,
            meta.provider,
            meta.built_at.to_rfc3339()
        ),
        Err(e) => format!("sift: healthy\nindex: not available ({e})"),
    }
}

fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results for \"{query}\".");
    }
    let mut out = format!("Results for \"{query}\":");
    for (rank, result) in results.iter().enumerate() {
        let doc = &result.document;
        let _ = write!(
            out,
            "\n{}. {} [{}] score={:.4}\n   {}",
            rank + 1,
            doc.title,
            doc.id,
            result.similarity_score,
            doc.origin_uri
        );
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
