//! Utility modules shared by Sift crates.

pub mod paths;
