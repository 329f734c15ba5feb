//! Host detection and the `<arch>-<os>` triple reported by `info` and the
//! generated build info.

pub mod arch;
pub mod os;
pub mod paths;

use std::fmt;

use serde::{Deserialize, Serialize};

use arch::Arch;
use os::Os;

/// Architecture and OS pair a build targets (e.g., "aarch64-darwin")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// The host platform, or `None` when its OS or architecture is not one
  /// the recipe can target.
  pub fn current() -> Option<Self> {
    Some(Self::new(Arch::current()?, Os::current()?))
  }

  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}
