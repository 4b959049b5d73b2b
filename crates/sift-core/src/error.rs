//! Error types for Sift operations.
//!
//! A single `Error` enum and `Result<T>` alias are shared by every Sift crate.
//! The variants follow the service's failure taxonomy:
//!
//! - configuration problems ([`Error::Config`]) are fatal and surfaced as-is
//! - input validation failures ([`Error::InvalidInput`]) are client errors
//! - upstream failures ([`Error::Embedding`], [`Error::Llm`], [`Error::Timeout`])
//!   are normally absorbed into fallback values by the caller
//! - persistence failures ([`Error::Io`], [`Error::InvalidData`], ...) are
//!   reported and turned into a fresh, empty store on load

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur in Sift operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with the path that caused it.
    #[error("I/O error at {path}: {source}")]
    IoWithPath {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error (missing credentials, unknown provider, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied invalid input (empty query, empty text).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid data or format.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic operation failure.
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Embedding generation failed.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector dimension does not match the index.
    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension {
        /// Dimension fixed by the index.
        expected: usize,
        /// Dimension that was supplied.
        actual: usize,
    },

    /// Generative model call failed.
    #[error("LLM error: {message}")]
    Llm {
        /// Description of the failure.
        message: String,
        /// Whether retrying the call may succeed.
        retryable: bool,
    },

    /// An operation exceeded its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),
}

impl Error {
    /// Create an I/O error without path context.
    pub fn io(err: std::io::Error) -> Self {
        Self::Io(err)
    }

    /// Create an I/O error annotated with the path involved.
    pub fn io_with_path(err: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source: err,
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an operation error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Create an embedding error.
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a non-retryable LLM error.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm {
            message: msg.into(),
            retryable: false,
        }
    }

    /// Create a retryable LLM error (network failure, rate limit, 5xx).
    pub fn llm_retryable(msg: impl Into<String>) -> Self {
        Self::Llm {
            message: msg.into(),
            retryable: true,
        }
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Whether retrying the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Llm { retryable: true, .. })
    }

    /// Whether the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Whether the error is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using Sift's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_display() {
        assert_eq!(
            Error::config("missing key").to_string(),
            "Configuration error: missing key"
        );
        assert_eq!(
            Error::invalid_input("empty query").to_string(),
            "Invalid input: empty query"
        );
        let err = Error::InvalidDimension {
            expected: 384,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Invalid vector dimension: expected 384, got 3"
        );
    }

    #[test]
    fn test_io_with_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::io_with_path(io, "/tmp/missing.json");
        assert!(err.to_string().contains("/tmp/missing.json"));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::llm_retryable("503").is_retryable());
        assert!(!Error::llm("bad request").is_retryable());
        assert!(!Error::timeout("30s").is_retryable());
        assert!(!Error::config("x").is_retryable());
    }

    #[test]
    fn test_classification() {
        assert!(Error::invalid_input("x").is_client_error());
        assert!(!Error::operation("x").is_client_error());
        assert!(Error::config("x").is_config());
        assert!(!Error::parse("x").is_config());
    }

    #[test]
    fn test_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
