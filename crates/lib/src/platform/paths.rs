//! Per-user config and data locations.
//!
//! Every lookup returns `None` when the environment does not name a home
//! directory, so callers can fall back to defaults instead of aborting.

use std::path::PathBuf;

use crate::consts::{APP_NAME, CONFIG_FILENAME};

/// Non-empty environment variable as a path.
fn env_path(var: &str) -> Option<PathBuf> {
  std::env::var_os(var).filter(|value| !value.is_empty()).map(PathBuf::from)
}

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
  env_path("USERPROFILE")
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> Option<PathBuf> {
  env_path("HOME")
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir() -> Option<PathBuf> {
  env_path("APPDATA").map(|appdata| appdata.join(APP_NAME))
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir() -> Option<PathBuf> {
  env_path("XDG_CONFIG_HOME")
    .or_else(|| home_dir().map(|home| home.join(".config")))
    .map(|config_home| config_home.join(APP_NAME))
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> Option<PathBuf> {
  env_path("APPDATA").map(|appdata| appdata.join(APP_NAME))
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> Option<PathBuf> {
  env_path("XDG_DATA_HOME")
    .or_else(|| home_dir().map(|home| home.join(".local").join("share")))
    .map(|data_home| data_home.join(APP_NAME))
}

/// Path of the default configuration file (`<config_dir>/config.json`)
pub fn default_config_path() -> Option<PathBuf> {
  config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

#[cfg(test)]
#[cfg(not(windows))]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn xdg_config_home_takes_precedence() {
    temp_env::with_vars(
      [
        ("XDG_CONFIG_HOME", Some("/custom/config")),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(config_dir(), Some(PathBuf::from("/custom/config").join(APP_NAME)));
        assert_eq!(
          default_config_path(),
          Some(PathBuf::from("/custom/config").join(APP_NAME).join("config.json"))
        );
      },
    );
  }

  #[test]
  #[serial]
  fn xdg_fallback_to_home_directories() {
    temp_env::with_vars(
      [
        ("XDG_CONFIG_HOME", None::<&str>),
        ("XDG_DATA_HOME", None::<&str>),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(config_dir(), Some(PathBuf::from("/home/user/.config").join(APP_NAME)));
        assert_eq!(data_dir(), Some(PathBuf::from("/home/user/.local/share").join(APP_NAME)));
      },
    );
  }

  #[test]
  #[serial]
  fn no_home_means_no_directories() {
    temp_env::with_vars(
      [
        ("XDG_CONFIG_HOME", None::<&str>),
        ("XDG_DATA_HOME", Some("")),
        ("HOME", None::<&str>),
      ],
      || {
        assert_eq!(home_dir(), None);
        assert_eq!(config_dir(), None);
        assert_eq!(data_dir(), None);
        assert_eq!(default_config_path(), None);
      },
    );
  }
}
