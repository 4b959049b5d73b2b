//! `sift config {path,get,set,init,export}` and the dotted-key helpers
//! they share.
//!
//! Each handler returns the text it would print, so the dispatcher owns
//! stdout and tests can check output directly.

use std::path::{Path, PathBuf};

use sift_core::{Error, Result};

use crate::cli::ConfigAction;
use crate::config::SiftConfig;

// ============================================================================
// Command dispatch
// ============================================================================

/// Handle a config subcommand.
///
/// Receives the raw `--config` path rather than a loaded config because
/// `path` and `init` must work before a config file exists.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<()> {
    let output = match action {
        ConfigAction::Path => config_path_report(config_path)?,
        ConfigAction::Get { key } => config_get(config_path, &key)?,
        ConfigAction::Set { key, value } => config_set(config_path, &key, &value)?,
        ConfigAction::Init { file, force } => config_init(file.as_deref(), force)?,
        ConfigAction::Export { docker_env } => {
            config_export(&SiftConfig::load(config_path)?, docker_env)?
        }
    };
    println!("{output}");
    Ok(())
}

// ============================================================================
// Command handlers
// ============================================================================

fn config_path_report(config_path: Option<&str>) -> Result<String> {
    let path = SiftConfig::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("Could not determine config directory for this platform"))?;
    if !path.exists() {
        eprintln!("(file does not exist; run `sift config init` to create it)");
    }
    Ok(path.display().to_string())
}

fn config_get(config_path: Option<&str>, key: &str) -> Result<String> {
    let config = SiftConfig::load(config_path)?;
    let value = toml::Value::try_from(&config).map_err(|e| Error::config(e.to_string()))?;
    get_nested_value(&value, key)
        .map(format_toml_value)
        .ok_or_else(|| Error::config(format!("Key '{key}' not found in configuration")))
}

/// Write `key = value` into the config file, refusing edits that would
/// leave the file unloadable.
fn config_set(config_path: Option<&str>, key: &str, value: &str) -> Result<String> {
    let path = SiftConfig::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("Could not determine config directory"))?;
    if !path.exists() {
        return Err(Error::config(format!(
            "Config file does not exist at {}. Run `sift config init` first.",
            path.display()
        )));
    }

    let mut doc = read_toml(&path)?;
    set_nested_value(&mut doc, key, parse_value(value))?;

    let _: SiftConfig = doc
        .clone()
        .try_into()
        .map_err(|e| Error::config(format!("Setting {key} = {value} is not valid: {e}")))?;

    let toml_str = toml::to_string_pretty(&doc).map_err(|e| Error::config(e.to_string()))?;
    std::fs::write(&path, toml_str).map_err(|e| Error::io_with_path(e, &path))?;

    Ok(format!("Set {key} = {value} in {}", path.display()))
}

fn config_init(file: Option<&str>, force: bool) -> Result<String> {
    let path = match file {
        Some(p) => PathBuf::from(p),
        None => SiftConfig::default_config_path()
            .ok_or_else(|| Error::config("Could not determine config directory"))?,
    };

    if path.exists() && !force {
        return Err(Error::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }

    sift_core::util::paths::ensure_parent_dir(&path)?;
    let toml_str = SiftConfig::default().to_toml_string()?;
    std::fs::write(&path, &toml_str).map_err(|e| Error::io_with_path(e, &path))?;

    Ok(format!("Config file created at {}", path.display()))
}

fn config_export(config: &SiftConfig, docker_env: bool) -> Result<String> {
    let lines: Vec<String> = config
        .to_env_vars()?
        .into_iter()
        .map(|(key, value)| {
            if docker_env {
                format!("--env {key}={value}")
            } else {
                format!("{key}={value}")
            }
        })
        .collect();
    Ok(lines.join("\n"))
}

fn read_toml(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
    toml::from_str(&content)
        .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
}

// ============================================================================
// TOML dotted-key helpers
// ============================================================================

/// Navigate a dotted key path in a TOML value tree.
fn get_nested_value<'a>(value: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(value, |current, part| current.as_table()?.get(part))
}

/// Set a value at a dotted key path, creating intermediate tables as needed.
fn set_nested_value(root: &mut toml::Value, key: &str, value: toml::Value) -> Result<()> {
    let (parents, leaf) = match key.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, key),
    };
    if leaf.is_empty() {
        return Err(Error::config("Empty key path"));
    }

    let mut current = root;
    for part in parents.into_iter().flat_map(|p| p.split('.')) {
        let table = current
            .as_table_mut()
            .ok_or_else(|| Error::config("Cannot navigate into a non-table value"))?;
        current = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    current
        .as_table_mut()
        .ok_or_else(|| Error::config("Cannot set key on a non-table value"))?
        .insert(leaf.to_string(), value);
    Ok(())
}

/// Parse a string value into a TOML value, auto-detecting the type.
///
/// Priority: bool, integer, float, then string.
fn parse_value(s: &str) -> toml::Value {
    match s {
        "true" => toml::Value::Boolean(true),
        "false" => toml::Value::Boolean(false),
        _ => s
            .parse::<i64>()
            .map(toml::Value::Integer)
            .or_else(|_| s.parse::<f64>().map(toml::Value::Float))
            .unwrap_or_else(|_| toml::Value::String(s.to_string())),
    }
}

/// Format a TOML value for display on stdout.
fn format_toml_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(_) | toml::Value::Table(_) => {
            toml::to_string_pretty(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn default_config_file() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SiftConfig::default().to_toml_string().unwrap()).unwrap();
        (dir, path)
    }

    // ------------------------------------------------------------------------
    // path
    // ------------------------------------------------------------------------

    #[test]
    fn test_config_path_explicit() {
        let output = config_path_report(Some("/explicit/config.toml")).unwrap();
        assert_eq!(output, "/explicit/config.toml");
    }

    // ------------------------------------------------------------------------
    // get
    // ------------------------------------------------------------------------

    #[test]
    fn test_config_get_nested_key() {
        let (_dir, path) = default_config_file();
        let output = config_get(Some(path.to_str().unwrap()), "server.port").unwrap();
        assert_eq!(output, "8000");
    }

    #[test]
    fn test_config_get_string_key() {
        let (_dir, path) = default_config_file();
        let output = config_get(Some(path.to_str().unwrap()), "source.data_path").unwrap();
        assert_eq!(output, "local_data");
    }

    #[test]
    fn test_config_get_missing_key() {
        let (_dir, path) = default_config_file();
        let err = config_get(Some(path.to_str().unwrap()), "store.nonexistent").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    // ------------------------------------------------------------------------
    // set
    // ------------------------------------------------------------------------

    #[test]
    fn test_config_set_nested_key() {
        let (_dir, path) = default_config_file();
        let output = config_set(Some(path.to_str().unwrap()), "store.default_k", "5").unwrap();
        assert!(output.contains("store.default_k = 5"));

        let config = SiftConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.store.default_k, 5);
    }

    #[test]
    fn test_config_set_rejects_wrong_type() {
        let (_dir, path) = default_config_file();
        let err = config_set(Some(path.to_str().unwrap()), "server.port", "lots").unwrap_err();
        assert!(err.is_config());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("port = 8000"));
    }

    #[test]
    fn test_config_set_missing_file() {
        let err = config_set(Some("/nonexistent/config.toml"), "server.port", "1").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    // ------------------------------------------------------------------------
    // init
    // ------------------------------------------------------------------------

    #[test]
    fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sift").join("config.toml");

        config_init(Some(path.to_str().unwrap()), false).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[store]"));
        assert!(content.contains("[server]"));
    }

    #[test]
    fn test_config_init_no_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "existing").unwrap();

        let err = config_init(Some(path.to_str().unwrap()), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing");
    }

    #[test]
    fn test_config_init_force_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "old content").unwrap();

        config_init(Some(path.to_str().unwrap()), true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[store]"));
    }

    // ------------------------------------------------------------------------
    // export
    // ------------------------------------------------------------------------

    #[test]
    fn test_config_export_plain_and_docker() {
        let config = SiftConfig::default();

        let plain = config_export(&config, false).unwrap();
        assert!(plain.lines().any(|l| l == "SIFT_SERVER_PORT=8000"));

        let docker = config_export(&config, true).unwrap();
        assert!(docker.lines().all(|l| l.starts_with("--env SIFT_")));
    }

    // ------------------------------------------------------------------------
    // Dotted-key helpers
    // ------------------------------------------------------------------------

    #[test]
    fn test_get_nested_value() {
        let val: toml::Value = toml::from_str("[store]\ndefault_k = 3").unwrap();
        assert_eq!(get_nested_value(&val, "store.default_k"), Some(&toml::Value::Integer(3)));
        assert!(get_nested_value(&val, "store.missing").is_none());
        assert!(get_nested_value(&val, "store.default_k.deeper").is_none());
    }

    #[test]
    fn test_set_nested_value_creates_sections() {
        let mut val = toml::Value::Table(toml::map::Map::new());
        set_nested_value(&mut val, "server.port", toml::Value::Integer(3000)).unwrap();
        assert_eq!(get_nested_value(&val, "server.port"), Some(&toml::Value::Integer(3000)));
    }

    #[test]
    fn test_set_nested_value_overwrites() {
        let mut val: toml::Value = toml::from_str("[server]\nport = 3000").unwrap();
        set_nested_value(&mut val, "server.port", toml::Value::Integer(8080)).unwrap();
        assert_eq!(get_nested_value(&val, "server.port"), Some(&toml::Value::Integer(8080)));
    }

    #[test]
    fn test_set_nested_value_through_scalar_fails() {
        let mut val: toml::Value = toml::from_str("port = 3000").unwrap();
        assert!(set_nested_value(&mut val, "port.inner", toml::Value::Integer(1)).is_err());
        assert!(set_nested_value(&mut val, "server.", toml::Value::Integer(1)).is_err());
    }

    #[test]
    fn test_parse_value_types() {
        assert_eq!(parse_value("true"), toml::Value::Boolean(true));
        assert_eq!(parse_value("false"), toml::Value::Boolean(false));
        assert_eq!(parse_value("42"), toml::Value::Integer(42));
        assert_eq!(parse_value("0.5"), toml::Value::Float(0.5));
        assert_eq!(parse_value("mock"), toml::Value::String("mock".to_string()));
    }

    #[test]
    fn test_format_toml_value() {
        assert_eq!(format_toml_value(&toml::Value::String("x".into())), "x");
        assert_eq!(format_toml_value(&toml::Value::Integer(42)), "42");
        assert_eq!(format_toml_value(&toml::Value::Boolean(true)), "true");
    }
}
