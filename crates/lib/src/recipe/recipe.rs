use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::options::ResolvedOptions;
use super::types::{Generator, RecipeError, Requirement};

pub const PACKAGE_NAME: &str = "memory_tracer";
pub const PACKAGE_VERSION: &str = "1.0.0";

/// Pinned dependency list, in declaration order.
pub const REQUIREMENTS: [(&str, &str); 4] = [
  ("spdlog", "1.12.0"),
  ("nlohmann_json", "3.11.2"),
  ("fmt", "10.1.1"),
  ("backward-cpp", "1.6"),
];

pub const GENERATORS: [Generator; 2] = [Generator::Bazel, Generator::Json];

/// Dependencies whose `shared` option follows the package's.
pub const SHARED_PROPAGATION: [&str; 2] = ["spdlog", "fmt"];

/// One shared-library copy rule applied by `imports`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportRule {
  pub pattern: &'static str,
  pub source: &'static str,
  pub destination: &'static str,
}

pub const IMPORT_RULES: [ImportRule; 3] = [
  ImportRule {
    pattern: "*.dll",
    source: "bin",
    destination: "bin",
  },
  ImportRule {
    pattern: "*.dylib*",
    source: "lib",
    destination: "lib",
  },
  ImportRule {
    pattern: "*.so*",
    source: "lib",
    destination: "lib",
  },
];

/// Install tree of a resolved dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInstall {
  pub name: String,
  pub root: PathBuf,
}

impl DependencyInstall {
  pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      root: root.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedFile {
  pub dependency: String,
  pub source: PathBuf,
  pub destination: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
  pub copied: Vec<ImportedFile>,
}

impl ImportReport {
  pub fn len(&self) -> usize {
    self.copied.len()
  }

  pub fn is_empty(&self) -> bool {
    self.copied.is_empty()
  }
}

/// Build description of the memory tracer package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
  name: String,
  version: String,
  requires: Vec<Requirement>,
  generators: Vec<Generator>,
}

impl Recipe {
  pub fn memory_tracer() -> Self {
    Self {
      name: PACKAGE_NAME.to_string(),
      version: PACKAGE_VERSION.to_string(),
      requires: REQUIREMENTS
        .iter()
        .map(|(name, version)| Requirement::new(*name, *version))
        .collect(),
      generators: GENERATORS.to_vec(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  /// `name/version` reference of the package itself.
  pub fn reference(&self) -> String {
    format!("{}/{}", self.name, self.version)
  }

  pub fn requires(&self) -> &[Requirement] {
    &self.requires
  }

  pub fn generators(&self) -> &[Generator] {
    &self.generators
  }

  pub fn import_rules(&self) -> &'static [ImportRule] {
    &IMPORT_RULES
  }

  /// Option set before any overrides: package defaults plus dependency
  /// defaults for every requirement.
  pub fn default_options(&self) -> ResolvedOptions {
    ResolvedOptions::with_dependencies(self.requires.iter().map(|r| r.name.clone()))
  }

  /// Propagate the package's `shared` choice to the logging and formatting
  /// dependencies. A static package leaves dependency options alone.
  pub fn configure(&self, options: &mut ResolvedOptions) -> Result<(), RecipeError> {
    if !options.package.shared {
      debug!("static build, dependency options left as resolved");
      return Ok(());
    }

    for dep in SHARED_PROPAGATION {
      options.dependency_mut(dep)?.shared = true;
      debug!(dependency = dep, "forced shared=true");
    }
    Ok(())
  }

  /// Copy shared-library artifacts of each dependency into `dest`.
  pub fn imports(&self, deps: &[DependencyInstall], dest: &Path) -> Result<ImportReport, RecipeError> {
    let mut report = ImportReport::default();

    for rule in &IMPORT_RULES {
      let pattern = Pattern::new(rule.pattern).map_err(|e| RecipeError::Pattern {
        pattern: rule.pattern.to_string(),
        message: e.to_string(),
      })?;

      for dep in deps {
        let source_root = dep.root.join(rule.source);
        if !source_root.is_dir() {
          debug!(dependency = %dep.name, path = ?source_root, "no source directory, skipping");
          continue;
        }
        let dest_root = dest.join(rule.destination);
        copy_matching(&dep.name, &source_root, &dest_root, &pattern, &mut report)?;
      }
    }

    info!(count = report.len(), dest = ?dest, "imported dependency artifacts");
    Ok(report)
  }
}

fn copy_matching(
  dependency: &str,
  source_root: &Path,
  dest_root: &Path,
  pattern: &Pattern,
  report: &mut ImportReport,
) -> Result<(), RecipeError> {
  for entry in WalkDir::new(source_root).sort_by_file_name() {
    let entry = entry.map_err(|e| RecipeError::Walk {
      path: source_root.to_path_buf(),
      message: e.to_string(),
    })?;
    let file_type = entry.file_type();
    let is_link = file_type.is_symlink();
    if !(file_type.is_file() || is_link) || (is_link && entry.path().is_dir()) {
      continue;
    }
    let file_name = entry.file_name().to_string_lossy();
    if !pattern.matches(&file_name) {
      continue;
    }

    // Paths yielded by the walker always sit below its root.
    let relative = entry.path().strip_prefix(source_root).unwrap_or(entry.path());
    let target = dest_root.join(relative);
    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent).map_err(|source| RecipeError::Write {
        path: parent.to_path_buf(),
        source,
      })?;
    }
    let copied = if is_link {
      copy_link(entry.path(), &target)
    } else {
      fs::copy(entry.path(), &target).map(drop)
    };
    copied.map_err(|source| RecipeError::Copy {
      from: entry.path().to_path_buf(),
      to: target.clone(),
      source,
    })?;
    debug!(dependency, from = ?entry.path(), to = ?target, link = is_link, "copied");

    report.copied.push(ImportedFile {
      dependency: dependency.to_string(),
      source: entry.path().to_path_buf(),
      destination: target,
    });
  }
  Ok(())
}

/// Recreates a library symlink (`libfoo.so -> libfoo.so.1`) with its
/// original target, so SONAME chains survive the import.
#[cfg(unix)]
fn copy_link(link: &Path, target: &Path) -> io::Result<()> {
  let points_to = fs::read_link(link)?;
  if fs::symlink_metadata(target).is_ok() {
    fs::remove_file(target)?;
  }
  std::os::unix::fs::symlink(points_to, target)
}

/// Without unix symlinks the resolved file is copied in place of the link.
#[cfg(not(unix))]
fn copy_link(link: &Path, target: &Path) -> io::Result<()> {
  fs::copy(link, target).map(drop)
}
