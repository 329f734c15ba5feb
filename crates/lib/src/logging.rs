//! Logging setup.
//!
//! Console output goes to stderr; an optional log file receives the same
//! events without colors. `RUST_LOG` takes precedence over the configured
//! level, and the level can be changed later through [`LoggingHandle`].

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt as tsfmt, reload};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Trace,
  Debug,
  #[default]
  Info,
  Warn,
  Error,
  /// Reported through the error level.
  Fatal,
}

impl LogLevel {
  pub fn as_str(&self) -> &'static str {
    match self {
      LogLevel::Trace => "trace",
      LogLevel::Debug => "debug",
      LogLevel::Info => "info",
      LogLevel::Warn => "warn",
      LogLevel::Error => "error",
      LogLevel::Fatal => "fatal",
    }
  }

  pub fn to_level_filter(self) -> LevelFilter {
    match self {
      LogLevel::Trace => LevelFilter::TRACE,
      LogLevel::Debug => LevelFilter::DEBUG,
      LogLevel::Info => LevelFilter::INFO,
      LogLevel::Warn => LevelFilter::WARN,
      LogLevel::Error | LogLevel::Fatal => LevelFilter::ERROR,
    }
  }
}

impl fmt::Display for LogLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for LogLevel {
  type Err = LoggingError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "trace" => Ok(LogLevel::Trace),
      "debug" => Ok(LogLevel::Debug),
      "info" => Ok(LogLevel::Info),
      "warn" | "warning" => Ok(LogLevel::Warn),
      "error" => Ok(LogLevel::Error),
      "fatal" | "critical" => Ok(LogLevel::Fatal),
      _ => Err(LoggingError::UnknownLevel(s.to_string())),
    }
  }
}

#[derive(Debug, Error)]
pub enum LoggingError {
  #[error("unknown log level: {0}")]
  UnknownLevel(String),

  #[error("failed to open log file {path}: {source}")]
  OpenFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("logging is already initialized")]
  AlreadyInitialized,

  #[error("failed to change log level: {0}")]
  Reload(String),
}

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
  pub level: LogLevel,
  pub file: Option<PathBuf>,
}

/// Adjusts the active filter after [`init`].
pub struct LoggingHandle {
  filter: reload::Handle<EnvFilter, Registry>,
}

impl LoggingHandle {
  pub fn set_level(&self, level: LogLevel) -> Result<(), LoggingError> {
    self
      .filter
      .reload(level_filter(level))
      .map_err(|e| LoggingError::Reload(e.to_string()))
  }
}

fn level_filter(level: LogLevel) -> EnvFilter {
  EnvFilter::builder()
    .with_default_directive(level.to_level_filter().into())
    .parse_lossy("")
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
  let open_err = |source| LoggingError::OpenFile {
    path: path.to_path_buf(),
    source,
  };
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent).map_err(open_err)?;
  }
  File::create(path).map_err(open_err)
}

/// Installs the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<LoggingHandle, LoggingError> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(config.level));
  let (filter_layer, handle) = reload::Layer::new(filter);

  let console = tsfmt::layer().with_writer(io::stderr).with_thread_ids(true);

  let file = match &config.file {
    Some(path) => Some(
      tsfmt::layer()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_writer(Mutex::new(open_log_file(path)?)),
    ),
    None => None,
  };

  tracing_subscriber::registry()
    .with(filter_layer)
    .with(console)
    .with(file)
    .try_init()
    .map_err(|_| LoggingError::AlreadyInitialized)?;

  Ok(LoggingHandle { filter: handle })
}
