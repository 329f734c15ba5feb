//! Descriptor rendering for the `bazel` and `json` generators.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use super::options::ResolvedOptions;
use super::recipe::Recipe;
use super::types::{Generator, RecipeError, Requirement, Settings};

/// Document written by the `json` generator.
#[derive(Debug, Serialize)]
pub struct BuildInfo<'a> {
  pub package: &'a str,
  pub version: &'a str,
  /// `<arch>-<os>` triple of the targeted settings.
  pub platform: String,
  pub settings: &'a Settings,
  pub options: &'a ResolvedOptions,
  pub requires: &'a [Requirement],
  pub generators: &'a [Generator],
}

pub fn render_json(recipe: &Recipe, settings: &Settings, options: &ResolvedOptions) -> Result<String, RecipeError> {
  let info = BuildInfo {
    package: recipe.name(),
    version: recipe.version(),
    platform: settings.platform().triple(),
    settings,
    options,
    requires: recipe.requires(),
    generators: recipe.generators(),
  };
  Ok(serde_json::to_string_pretty(&info)?)
}

/// Bazel target name for a dependency (`backward-cpp` -> `backward_cpp`).
pub fn bazel_target(name: &str) -> String {
  name.replace(['-', '.'], "_")
}

pub fn render_bazel(recipe: &Recipe, options: &ResolvedOptions) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "# {} dependencies", recipe.reference());
  let _ = writeln!(out, "package(default_visibility = [\"//visibility:public\"])");

  for req in recipe.requires() {
    let shared = options.dependency(&req.name).is_some_and(|o| o.shared);
    let _ = writeln!(out);
    let _ = writeln!(out, "cc_library(");
    let _ = writeln!(out, "    name = \"{}\",", bazel_target(&req.name));
    let _ = writeln!(out, "    hdrs = glob([\"{}/include/**\"]),", req.name);
    let _ = writeln!(out, "    includes = [\"{}/include\"],", req.name);
    if shared {
      let _ = writeln!(out, "    srcs = glob([\"{}/lib/*.so*\", \"{}/lib/*.dylib*\"]),", req.name, req.name);
    } else {
      let _ = writeln!(out, "    srcs = glob([\"{}/lib/*.a\", \"{}/lib/*.lib\"]),", req.name, req.name);
    }
    let _ = writeln!(out, "    tags = [\"version={}\"],", req.version);
    let _ = writeln!(out, ")");
  }
  out
}

/// Write one descriptor per generator into `dir`, returning the written paths.
pub fn write_descriptors(
  recipe: &Recipe,
  settings: &Settings,
  options: &ResolvedOptions,
  dir: &Path,
) -> Result<Vec<PathBuf>, RecipeError> {
  fs::create_dir_all(dir).map_err(|source| RecipeError::Write {
    path: dir.to_path_buf(),
    source,
  })?;

  let mut written = Vec::with_capacity(recipe.generators().len());
  for generator in recipe.generators() {
    let content = match generator {
      Generator::Json => render_json(recipe, settings, options)?,
      Generator::Bazel => render_bazel(recipe, options),
    };
    let path = dir.join(generator.filename());
    fs::write(&path, content).map_err(|source| RecipeError::Write {
      path: path.clone(),
      source,
    })?;
    info!(generator = %generator, path = ?path, "wrote descriptor");
    written.push(path);
  }
  Ok(written)
}
