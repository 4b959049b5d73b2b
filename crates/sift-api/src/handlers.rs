//! Route handler functions for all API endpoints.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use sift_analysis::IncidentAnalysis;
use sift_vector::{BuildOutcome, SearchResult, StoreState};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Number of results; the configured default when absent.
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub documents: usize,
    pub store_state: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    pub message: String,
    pub pages_added: usize,
    pub total_pages_in_store: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub query: String,
    pub analysis: IncidentAnalysis,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /`
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "AI Incident Analyst Backend is running.".to_string(),
    })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.store.snapshot();
    let store_state = match snapshot.state() {
        StoreState::Empty => "empty",
        StoreState::Loaded => "loaded",
        StoreState::Built => "built",
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents: snapshot.len(),
        store_state: store_state.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// `GET /sync`: rebuild the store from the document source.
pub async fn sync(State(state): State<AppState>) -> Result<Json<SyncResponse>, ApiError> {
    tracing::info!(source = state.source.name(), "sync requested");
    let documents = state.source.fetch_documents().await?;

    if documents.is_empty() {
        return Ok(Json(SyncResponse {
            message: "Sync complete. No local documents found to add to the vector store."
                .to_string(),
            pages_added: 0,
            total_pages_in_store: state.store.len(),
        }));
    }

    let (message, pages_added) = match state.store.build_index_from_documents(documents).await? {
        BuildOutcome::Built { documents, .. } => (
            format!("Sync successful. Rebuilt index with {documents} pages."),
            documents,
        ),
        BuildOutcome::Skipped(reason) => {
            tracing::warn!(%reason, "sync left the index unchanged");
            (
                format!("Sync skipped: {reason}. The existing index was kept."),
                0,
            )
        }
    };

    Ok(Json(SyncResponse {
        message,
        pages_added,
        total_pages_in_store: state.store.len(),
    }))
}

/// `POST /search`
pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = payload?;
    let k = request.k.unwrap_or(state.default_k);
    tracing::info!(query = %request.query, k, "search");

    let results = state.store.search(&request.query, k).await?;
    Ok(Json(SearchResponse {
        query: request.query,
        results,
    }))
}

/// `POST /analyze`
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(request) = payload?;
    let analysis = state.analyzer.analyze(&request.query).await?;
    Ok(Json(AnalyzeResponse {
        query: request.query,
        analysis,
    }))
}
