//! Shared errors and utilities for Sift.
//!
//! This crate has no internal Sift dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`util`]: Path helpers

pub mod error;
pub mod util;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
