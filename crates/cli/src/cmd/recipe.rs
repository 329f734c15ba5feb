use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::json;

use memtrace_lib::recipe::{DependencyInstall, Recipe, ResolvedOptions, Settings, write_descriptors};

use crate::output::{self, OutputFormat, print_info, print_json, print_stat, print_success};

#[derive(Debug, Subcommand)]
pub enum RecipeCommand {
  /// Show package identity, dependencies, options and generators
  Show,

  /// Resolve options and run the configure hook
  Configure {
    /// Option override, e.g. shared=False or spdlog:shared=True
    #[arg(short = 'o', long = "option")]
    options: Vec<String>,
  },

  /// Copy dependency shared libraries into a destination tree
  Imports {
    /// Dependency install tree as name=path (or a path named after its directory)
    #[arg(long = "dep", required = true)]
    deps: Vec<String>,

    /// Destination root (bin/ and lib/ are created as needed)
    #[arg(long)]
    dest: PathBuf,
  },

  /// Write the bazel and json descriptors into a directory
  Generate {
    /// Output directory
    #[arg(long)]
    out: PathBuf,

    /// Option override, e.g. shared=False
    #[arg(short = 'o', long = "option")]
    options: Vec<String>,

    /// Setting override, e.g. build_type=Debug or arch=armv8 (default: host)
    #[arg(short = 's', long = "setting")]
    settings: Vec<String>,
  },
}

fn resolve(recipe: &Recipe, overrides: &[String]) -> Result<ResolvedOptions> {
  let mut options = recipe.default_options();
  for flag in overrides {
    options
      .apply_override(flag)
      .with_context(|| format!("Invalid option override '{}'", flag))?;
  }
  recipe.configure(&mut options).context("configure failed")?;
  Ok(options)
}

fn resolve_settings(overrides: &[String]) -> Result<Settings> {
  let mut settings = Settings::detect()?;
  for flag in overrides {
    settings
      .apply_override(flag)
      .with_context(|| format!("Invalid setting override '{}'", flag))?;
  }
  Ok(settings)
}

fn parse_dep(arg: &str) -> Result<DependencyInstall> {
  if let Some((name, path)) = arg.split_once('=') {
    return Ok(DependencyInstall::new(name, path));
  }
  let path = PathBuf::from(arg);
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .with_context(|| format!("Cannot derive a dependency name from '{}'", arg))?;
  Ok(DependencyInstall::new(name, path))
}

fn print_options(options: &ResolvedOptions) {
  print_stat(
    "package",
    &format!("shared={} fPIC={}", options.package.shared, options.package.fpic),
  );
  for (name, opts) in &options.dependencies {
    print_stat(name, &format!("shared={} fPIC={}", opts.shared, opts.fpic));
  }
}

pub fn cmd_recipe(command: RecipeCommand, verbose: bool, output: OutputFormat) -> Result<()> {
  let recipe = Recipe::memory_tracer();

  match command {
    RecipeCommand::Show => {
      let options = recipe.default_options();
      if output.is_json() {
        return print_json(&json!({
          "name": recipe.name(),
          "version": recipe.version(),
          "requires": recipe.requires(),
          "generators": recipe.generators(),
          "options": options.package,
          "imports": recipe.import_rules(),
        }));
      }

      print_success(&format!("Package {}", recipe.reference()));
      println!();
      println!("Requires:");
      for req in recipe.requires() {
        println!("  {} {}", output::symbols::INFO, req);
      }
      println!();
      println!("Generators:");
      for generator in recipe.generators() {
        println!("  {} {}", output::symbols::INFO, generator);
      }
      println!();
      println!("Options:");
      print_stat("shared", &options.package.shared.to_string());
      print_stat("fPIC", &options.package.fpic.to_string());
      if verbose {
        println!();
        println!("Imports:");
        for rule in recipe.import_rules() {
          println!(
            "  {} {} {} {} {}",
            output::symbols::INFO,
            rule.pattern,
            rule.source,
            output::symbols::ARROW,
            rule.destination
          );
        }
      }
    }

    RecipeCommand::Configure { options } => {
      let resolved = resolve(&recipe, &options)?;
      if output.is_json() {
        return print_json(&resolved);
      }
      print_success("Configured options");
      print_options(&resolved);
    }

    RecipeCommand::Imports { deps, dest } => {
      let installs = deps.iter().map(|d| parse_dep(d)).collect::<Result<Vec<_>>>()?;
      let report = recipe.imports(&installs, &dest)?;
      if output.is_json() {
        return print_json(&report);
      }
      if report.is_empty() {
        print_info("No shared libraries to import");
        return Ok(());
      }
      print_success(&format!("Imported {} file(s) into {}", report.len(), dest.display()));
      if verbose {
        for file in &report.copied {
          println!(
            "  {} {} {} {}",
            file.dependency,
            file.source.display(),
            output::symbols::ARROW,
            file.destination.display()
          );
        }
      }
    }

    RecipeCommand::Generate { out, options, settings } => {
      let resolved = resolve(&recipe, &options)?;
      let settings = resolve_settings(&settings)?;
      let written = write_descriptors(&recipe, &settings, &resolved, &out)?;
      if output.is_json() {
        return print_json(&json!({ "written": written }));
      }
      print_success(&format!("Wrote {} descriptor(s)", written.len()));
      for path in &written {
        println!("  {} {}", output::symbols::INFO, path.display());
      }
    }
  }

  Ok(())
}
