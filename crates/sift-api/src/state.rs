//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use sift_analysis::IncidentAnalyzer;
use sift_vector::{DocumentSource, VectorStore};

/// Browser origins allowed by default.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:8000"];

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// The vector store served by `/search` and rebuilt by `/sync`.
    pub store: Arc<VectorStore>,
    /// Where `/sync` reads documents from.
    pub source: Arc<dyn DocumentSource>,
    /// Backs `/analyze`.
    pub analyzer: Arc<IncidentAnalyzer>,
    /// Result count when a search does not ask for one.
    pub default_k: usize,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with the given components.
    pub fn new(
        store: Arc<VectorStore>,
        source: Arc<dyn DocumentSource>,
        analyzer: Arc<IncidentAnalyzer>,
    ) -> Self {
        Self {
            default_k: store.config().default_k,
            store,
            source,
            analyzer,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            start_time: Instant::now(),
        }
    }

    /// Replace the CORS origin list.
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}
