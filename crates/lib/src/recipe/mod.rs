//! Package recipe for the memory tracer.
//!
//! Holds the package identity, its pinned dependencies, the `shared`/`fPIC`
//! options and the two lifecycle hooks a build orchestrator calls:
//! [`Recipe::configure`] propagates the shared-library choice to the logging
//! and formatting dependencies, and [`Recipe::imports`] gathers the
//! dependencies' shared-library artifacts next to the built binaries.

mod generators;
mod options;
#[allow(clippy::module_inception)]
mod recipe;
mod types;

pub use generators::{BuildInfo, bazel_target, render_bazel, render_json, write_descriptors};
pub use options::{PackageOptions, ResolvedOptions};
pub use recipe::{
  DependencyInstall, GENERATORS, IMPORT_RULES, ImportReport, ImportRule, ImportedFile, PACKAGE_NAME, PACKAGE_VERSION,
  REQUIREMENTS, Recipe, SHARED_PROPAGATION,
};
pub use types::{BuildType, Compiler, Generator, RecipeError, Requirement, Settings};
