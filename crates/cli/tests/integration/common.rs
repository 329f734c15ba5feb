//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory for config, data and outputs.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Get a pre-configured Command for the memtrace binary.
  ///
  /// Runs inside the temp directory with `HOME` and the XDG directories
  /// pointing into it, so no user config is picked up.
  pub fn memtrace_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("memtrace");
    cmd.current_dir(self.path());
    cmd.env("HOME", self.path());
    cmd.env("XDG_CONFIG_HOME", self.path().join("config"));
    cmd.env("XDG_DATA_HOME", self.path().join("data"));
    cmd.env("APPDATA", self.path().join("data")); // For Windows
    cmd.env_remove("RUST_LOG");
    cmd
  }
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
  serde_json::from_slice(&output.stdout)
    .unwrap_or_else(|e| panic!("stdout is not JSON ({}): {}", e, String::from_utf8_lossy(&output.stdout)))
}
