use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// CPU architectures the tracer and its recipe know how to target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
  X86,
  X86_64,
  Armv7,
  Aarch64,
  Riscv64,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86" => Some(Self::X86),
      "x86_64" => Some(Self::X86_64),
      "arm" => Some(Self::Armv7),
      "aarch64" => Some(Self::Aarch64),
      "riscv64" => Some(Self::Riscv64),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::X86_64 => "x86_64",
      Self::Armv7 => "armv7",
      Self::Aarch64 => "aarch64",
      Self::Riscv64 => "riscv64",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Arch {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "x86" | "i386" | "i686" => Ok(Self::X86),
      "x86_64" | "amd64" => Ok(Self::X86_64),
      "armv7" | "armv7hf" | "armhf" | "arm" => Ok(Self::Armv7),
      "aarch64" | "armv8" | "arm64" => Ok(Self::Aarch64),
      "riscv64" => Ok(Self::Riscv64),
      other => Err(format!("unsupported arch: {}", other)),
    }
  }
}
