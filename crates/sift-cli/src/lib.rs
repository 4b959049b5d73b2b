//! The `sift` command-line application.
//!
//! - [`cli`]: clap argument types
//! - [`config`]: [`SiftConfig`](config::SiftConfig), loaded with confyg
//! - [`app`]: logging setup and command dispatch
//! - [`commands`], [`config_handlers`]: the command implementations

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod config_handlers;

pub use app::SiftCli;
pub use cli::CliArgs;
pub use config::SiftConfig;
