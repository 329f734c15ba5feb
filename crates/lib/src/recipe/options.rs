use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::RecipeError;

/// The `shared` / `fPIC` pair every package in the graph carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOptions {
  pub shared: bool,
  #[serde(rename = "fPIC")]
  pub fpic: bool,
}

impl PackageOptions {
  /// Defaults declared by the tracer package itself.
  pub const fn package_defaults() -> Self {
    Self { shared: true, fpic: true }
  }

  /// Defaults dependencies start from before any propagation.
  pub const fn dependency_defaults() -> Self {
    Self {
      shared: false,
      fpic: true,
    }
  }

  fn set(&mut self, option: &str, value: bool) -> Result<(), RecipeError> {
    match option {
      "shared" => self.shared = value,
      "fPIC" | "fpic" => self.fpic = value,
      other => return Err(RecipeError::UnknownOption(other.to_string())),
    }
    Ok(())
  }
}

/// Options for the package and each of its dependencies, as resolved before
/// `configure` runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOptions {
  pub package: PackageOptions,
  pub dependencies: BTreeMap<String, PackageOptions>,
}

impl ResolvedOptions {
  /// Package defaults plus dependency defaults for each named dependency.
  pub fn with_dependencies<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      package: PackageOptions::package_defaults(),
      dependencies: names
        .into_iter()
        .map(|name| (name.into(), PackageOptions::dependency_defaults()))
        .collect(),
    }
  }

  pub fn dependency(&self, name: &str) -> Option<&PackageOptions> {
    self.dependencies.get(name)
  }

  pub fn dependency_mut(&mut self, name: &str) -> Result<&mut PackageOptions, RecipeError> {
    self
      .dependencies
      .get_mut(name)
      .ok_or_else(|| RecipeError::UnknownDependency(name.to_string()))
  }

  /// Apply one `name=value` or `dep:name=value` override.
  pub fn apply_override(&mut self, flag: &str) -> Result<(), RecipeError> {
    let (key, raw) = flag
      .split_once('=')
      .ok_or_else(|| RecipeError::MalformedOverride(flag.to_string()))?;
    let key = key.trim();
    let raw = raw.trim();
    if key.is_empty() {
      return Err(RecipeError::MalformedOverride(flag.to_string()));
    }

    let value = parse_bool(raw).ok_or_else(|| RecipeError::InvalidValue {
      option: key.to_string(),
      value: raw.to_string(),
    })?;

    match key.split_once(':') {
      Some((dep, option)) => self.dependency_mut(dep)?.set(option, value),
      None => self.package.set(key, value),
    }
  }
}

fn parse_bool(raw: &str) -> Option<bool> {
  match raw {
    "True" | "true" | "1" => Some(true),
    "False" | "false" | "0" => Some(false),
    _ => None,
  }
}
