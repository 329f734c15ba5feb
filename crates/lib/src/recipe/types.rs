use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::Platform;
use crate::platform::arch::Arch;
use crate::platform::os::Os;

#[derive(Debug, Error)]
pub enum RecipeError {
  #[error("unknown dependency: {0}")]
  UnknownDependency(String),

  #[error("unknown option: {0}")]
  UnknownOption(String),

  #[error("invalid value '{value}' for option {option}")]
  InvalidValue { option: String, value: String },

  #[error("malformed option override '{0}', expected [dep:]name=value")]
  MalformedOverride(String),

  #[error("unknown setting: {0}")]
  UnknownSetting(String),

  #[error("invalid setting {setting}: {message}")]
  InvalidSetting { setting: String, message: String },

  #[error("malformed setting override '{0}', expected name=value")]
  MalformedSetting(String),

  #[error("unsupported host platform")]
  UnsupportedPlatform,

  #[error("invalid import pattern '{pattern}': {message}")]
  Pattern { pattern: String, message: String },

  #[error("failed to copy {from} to {to}: {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to walk {path}: {message}")]
  Walk { path: PathBuf, message: String },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to serialize build info: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// A pinned `name/version` dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
  pub name: String,
  pub version: String,
}

impl Requirement {
  pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      version: version.into(),
    }
  }
}

impl fmt::Display for Requirement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.name, self.version)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compiler {
  Gcc,
  Clang,
  AppleClang,
  Msvc,
}

impl Compiler {
  pub fn as_str(&self) -> &'static str {
    match self {
      Compiler::Gcc => "gcc",
      Compiler::Clang => "clang",
      Compiler::AppleClang => "apple-clang",
      Compiler::Msvc => "msvc",
    }
  }

  /// The toolchain usually found on `os`.
  pub fn default_for(os: Os) -> Self {
    match os {
      Os::Linux => Compiler::Gcc,
      Os::MacOs => Compiler::AppleClang,
      Os::Windows => Compiler::Msvc,
    }
  }
}

impl FromStr for Compiler {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "gcc" => Ok(Compiler::Gcc),
      "clang" => Ok(Compiler::Clang),
      "apple-clang" => Ok(Compiler::AppleClang),
      "msvc" | "visual studio" => Ok(Compiler::Msvc),
      other => Err(format!("unsupported compiler: {}", other)),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildType {
  Debug,
  #[default]
  Release,
  RelWithDebInfo,
  MinSizeRel,
}

impl BuildType {
  pub fn as_str(&self) -> &'static str {
    match self {
      BuildType::Debug => "Debug",
      BuildType::Release => "Release",
      BuildType::RelWithDebInfo => "RelWithDebInfo",
      BuildType::MinSizeRel => "MinSizeRel",
    }
  }
}

impl FromStr for BuildType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "debug" => Ok(BuildType::Debug),
      "release" => Ok(BuildType::Release),
      "relwithdebinfo" => Ok(BuildType::RelWithDebInfo),
      "minsizerel" => Ok(BuildType::MinSizeRel),
      other => Err(format!("unsupported build type: {}", other)),
    }
  }
}

/// The settings axes supplied by whoever drives the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settings {
  pub os: Os,
  pub compiler: Compiler,
  pub build_type: BuildType,
  pub arch: Arch,
}

impl Settings {
  /// Settings for the host with its usual compiler and a release build.
  pub fn detect() -> Result<Self, RecipeError> {
    Platform::current()
      .map(Self::for_platform)
      .ok_or(RecipeError::UnsupportedPlatform)
  }

  /// Settings targeting `platform` with its usual compiler and a release build.
  pub fn for_platform(platform: Platform) -> Self {
    Self {
      os: platform.os,
      compiler: Compiler::default_for(platform.os),
      build_type: BuildType::default(),
      arch: platform.arch,
    }
  }

  pub fn platform(&self) -> Platform {
    Platform::new(self.arch, self.os)
  }

  /// Apply a `name=value` override such as `build_type=Debug` or `arch=armv8`.
  ///
  /// Changing `os` does not change the compiler; override both when needed.
  pub fn apply_override(&mut self, flag: &str) -> Result<(), RecipeError> {
    let (name, value) = flag
      .split_once('=')
      .map(|(n, v)| (n.trim(), v.trim()))
      .filter(|(n, v)| !n.is_empty() && !v.is_empty())
      .ok_or_else(|| RecipeError::MalformedSetting(flag.to_string()))?;

    let invalid = |message: String| RecipeError::InvalidSetting {
      setting: name.to_string(),
      message,
    };
    match name {
      "os" => self.os = value.parse().map_err(invalid)?,
      "arch" => self.arch = value.parse().map_err(invalid)?,
      "compiler" => self.compiler = value.parse().map_err(invalid)?,
      "build_type" => self.build_type = value.parse().map_err(invalid)?,
      other => return Err(RecipeError::UnknownSetting(other.to_string())),
    }
    Ok(())
  }
}

/// Output formats bridging into a downstream build system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generator {
  Bazel,
  Json,
}

impl Generator {
  pub fn as_str(&self) -> &'static str {
    match self {
      Generator::Bazel => "bazel",
      Generator::Json => "json",
    }
  }

  /// File the generator writes into the output directory.
  pub fn filename(&self) -> &'static str {
    match self {
      Generator::Bazel => "BUILD.bazel",
      Generator::Json => "buildinfo.json",
    }
  }
}

impl fmt::Display for Generator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn linux_x86_64() -> Settings {
    Settings::for_platform(Platform::new(Arch::X86_64, Os::Linux))
  }

  #[test]
  fn requirement_displays_as_reference() {
    assert_eq!(Requirement::new("backward-cpp", "1.6").to_string(), "backward-cpp/1.6");
  }

  #[test]
  fn settings_detect_matches_host() {
    let settings = Settings::detect().unwrap();
    assert_eq!(Some(settings.os), Os::current());
    assert_eq!(settings.compiler, Compiler::default_for(settings.os));
    assert_eq!(settings.build_type, BuildType::Release);
  }

  #[test]
  fn overrides_replace_each_axis() {
    let mut settings = linux_x86_64();
    settings.apply_override("build_type=relwithdebinfo").unwrap();
    settings.apply_override("arch=armv8").unwrap();
    settings.apply_override("os=Macos").unwrap();
    settings.apply_override(" compiler = apple-clang ").unwrap();

    assert_eq!(
      settings,
      Settings {
        os: Os::MacOs,
        compiler: Compiler::AppleClang,
        build_type: BuildType::RelWithDebInfo,
        arch: Arch::Aarch64,
      }
    );
    assert_eq!(settings.platform().triple(), "aarch64-darwin");
  }

  #[test]
  fn overrides_reject_bad_input() {
    let mut settings = linux_x86_64();
    assert!(matches!(
      settings.apply_override("build_type=fast"),
      Err(RecipeError::InvalidSetting { ref setting, .. }) if setting == "build_type"
    ));
    assert!(matches!(
      settings.apply_override("compiler.version=12"),
      Err(RecipeError::UnknownSetting(ref name)) if name == "compiler.version"
    ));
    for bad in ["os", "=linux", "arch="] {
      assert!(matches!(settings.apply_override(bad), Err(RecipeError::MalformedSetting(_))), "{bad}");
    }
    assert_eq!(settings, linux_x86_64());
  }
}
