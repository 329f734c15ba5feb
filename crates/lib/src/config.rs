//! Tracer configuration.
//!
//! Read from a JSON file (by default `<config_dir>/config.json`). A missing
//! file yields the defaults; every field is optional.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{DEFAULT_BUCKET_NS, DEFAULT_DATA_DIR, DEFAULT_MAX_ALLOCATIONS, DEFAULT_MAX_FRAMES};
use crate::logging::{LogLevel, LoggingConfig};
use crate::platform::paths::default_config_path;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub data_dir: PathBuf,
  pub max_allocations: usize,
  pub max_frames: usize,
  pub bucket_ns: u64,
  pub log_level: LogLevel,
  pub log_file: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_dir: PathBuf::from(DEFAULT_DATA_DIR),
      max_allocations: DEFAULT_MAX_ALLOCATIONS,
      max_frames: DEFAULT_MAX_FRAMES,
      bucket_ns: DEFAULT_BUCKET_NS,
      log_level: LogLevel::default(),
      log_file: None,
    }
  }
}

impl Config {
  /// Load from `path`, falling back to defaults when it does not exist.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = ?path, "no config file, using defaults");
        return Ok(Self::default());
      }
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Load from `path` if given, otherwise from the default location. With no
  /// home directory to locate that, the defaults are used.
  pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
    match path.map(Path::to_path_buf).or_else(default_config_path) {
      Some(path) => Self::load(&path),
      None => {
        debug!("no config directory, using defaults");
        Ok(Self::default())
      }
    }
  }

  pub fn logging(&self) -> LoggingConfig {
    LoggingConfig {
      level: self.log_level,
      file: self.log_file.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn missing_file_gives_defaults() {
    let temp = TempDir::new().unwrap();
    let config = Config::load(&temp.path().join("absent.json")).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.data_dir, PathBuf::from("./data"));
  }

  #[test]
  fn partial_file_keeps_other_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, r#"{"max_allocations": 10, "log_level": "debug"}"#).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.max_allocations, 10);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.max_frames, DEFAULT_MAX_FRAMES);
  }

  #[test]
  fn unknown_fields_are_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, r#"{"max_allocs": 10}"#).unwrap();
    assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
  }

  #[test]
  #[serial_test::serial]
  #[cfg(not(windows))]
  fn default_location_follows_xdg() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join(crate::consts::APP_NAME);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.json"), r#"{"max_frames": 4}"#).unwrap();

    temp_env::with_var("XDG_CONFIG_HOME", Some(temp.path()), || {
      assert_eq!(Config::load_or_default(None).unwrap().max_frames, 4);
    });
  }

  #[test]
  #[serial_test::serial]
  #[cfg(not(windows))]
  fn no_home_falls_back_to_defaults() {
    temp_env::with_vars(
      [("XDG_CONFIG_HOME", None::<&str>), ("HOME", None::<&str>)],
      || {
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
      },
    );
  }
}
