//! HTTP API for Sift.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /` | liveness banner |
//! | `GET /health` | version, store size and state |
//! | `GET /sync` | rebuild the index from the document source |
//! | `POST /search` | `{query, k?}` -> `{query, results}` |
//! | `POST /analyze` | `{query}` -> `{query, analysis}` |

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, serve};
pub use state::AppState;
