//! The `sift` application: logging setup and command dispatch.

use sift_core::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command};
use crate::config::SiftConfig;
use crate::{commands, config_handlers};

// ============================================================================
// SiftCli
// ============================================================================

/// The `sift` application over a loaded configuration.
pub struct SiftCli {
    config: SiftConfig,
    version: String,
}

impl SiftCli {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = SiftConfig::load(args.config.as_deref())?;
        Ok(Self::new(config))
    }

    /// Create an application over `config`.
    pub fn new(config: SiftConfig) -> Self {
        Self {
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn config(&self) -> &SiftConfig {
        &self.config
    }

    /// Initialise tracing-based logging.
    ///
    /// `RUST_LOG` wins when set; otherwise `quiet` selects `warn`, `verbose`
    /// selects `debug`, and the default is `info`. Records emitted through
    /// the `log` facade by the library crates land in the same subscriber.
    pub fn init_logging(verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(default_level(verbose, quiet))
        };

        // Ignore error if a subscriber is already set (e.g. in tests).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Run the command named by `args`.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        Self::init_logging(args.verbose, args.quiet);
        let config = &self.config;

        match args.command {
            Some(Command::Serve { port }) => commands::serve(config, port).await,
            Some(Command::Index { check }) => {
                println!("{}", commands::index(config, check).await?);
                Ok(())
            }
            Some(Command::Search { query, k }) => {
                println!("{}", commands::search(config, &query, k).await?);
                Ok(())
            }
            Some(Command::Analyze { text }) => {
                println!("{}", commands::analyze(config, &text).await?);
                Ok(())
            }
            Some(Command::Version) => {
                println!("sift {}", self.version);
                Ok(())
            }
            Some(Command::Health) => {
                println!("{}", commands::health(config));
                Ok(())
            }
            Some(Command::Config(config_cmd)) => {
                config_handlers::handle_config_command(args.config.as_deref(), config_cmd.command)
            }
            None => {
                println!("sift {}: use --help for usage", self.version);
                Ok(())
            }
        }
    }
}

fn default_level(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    fn mock_config(dir: &tempfile::TempDir) -> SiftConfig {
        let mut config = SiftConfig::default();
        config.store.index_path = dir.path().join("v.idx").to_string_lossy().into_owned();
        config.store.metadata_path = dir.path().join("m.json").to_string_lossy().into_owned();
        config.embedding.provider = "mock".to_string();
        config.embedding.dimension = 32;
        config.source.data_path = dir.path().join("data").to_string_lossy().into_owned();
        config
    }

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(false, false), "info");
        assert_eq!(default_level(true, false), "debug");
        assert_eq!(default_level(false, true), "warn");
        assert_eq!(default_level(true, true), "warn");
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        SiftCli::init_logging(false, false);
        SiftCli::init_logging(true, false);
    }

    #[test]
    fn test_from_args_with_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9191\n").unwrap();

        let args = CliArgs::parse_from(["sift", "--config", path.to_str().unwrap()]);
        let cli = SiftCli::from_args(&args).unwrap();
        assert_eq!(cli.config().server.port, 9191);
    }

    #[tokio::test]
    async fn test_run_version_and_no_command() {
        let cli = SiftCli::new(SiftConfig::default());
        cli.run(CliArgs::parse_from(["sift", "version"])).await.unwrap();
        cli.run(CliArgs::parse_from(["sift"])).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_index_then_search() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = mock_config(&dir);
        std::fs::create_dir_all(&config.source.data_path).unwrap();
        std::fs::write(
            std::path::Path::new(&config.source.data_path).join("oom_kill.md"),
            "worker pods killed by the oom killer",
        )
        .unwrap();

        let cli = SiftCli::new(config);
        cli.run(CliArgs::parse_from(["sift", "index"])).await.unwrap();
        cli.run(CliArgs::parse_from(["sift", "search", "oom killer", "-k", "1"]))
            .await
            .unwrap();
        cli.run(CliArgs::parse_from(["sift", "health"])).await.unwrap();
        assert!(std::path::Path::new(&cli.config().store.index_path).exists());
    }

    #[tokio::test]
    async fn test_run_search_propagates_input_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = SiftCli::new(mock_config(&dir));
        let err = cli
            .run(CliArgs::parse_from(["sift", "search", " "]))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_run_config_init() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sift.toml");
        let cli = SiftCli::new(SiftConfig::default());
        cli.run(CliArgs::parse_from([
            "sift",
            "config",
            "init",
            "--file",
            path.to_str().unwrap(),
        ]))
        .await
        .unwrap();
        assert!(path.exists());
    }
}
