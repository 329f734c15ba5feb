use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use memtrace_lib::config::Config;
use memtrace_lib::platform::Platform;
use memtrace_lib::platform::paths::{config_dir, data_dir};
use memtrace_lib::recipe::Settings;

use crate::output::{OutputFormat, print_json, print_stat};

pub fn cmd_info(output: OutputFormat) -> Result<()> {
  let platform = Platform::current();
  let settings = platform.map(Settings::for_platform);
  let defaults = Config::default();

  if output.is_json() {
    return print_json(&json!({
      "version": env!("CARGO_PKG_VERSION"),
      "platform": platform.map(|p| p.triple()),
      "settings": settings,
      "config_dir": config_dir(),
      "data_dir": data_dir(),
      "default_max_allocations": defaults.max_allocations,
    }));
  }

  println!("System:");
  match settings {
    Some(settings) => {
      println!("Platform: {}", settings.platform());
      println!(
        "Default settings: compiler={} build_type={}",
        settings.compiler.as_str(),
        settings.build_type.as_str()
      );
    }
    None => println!("Could not detect platform."),
  }
  println!();
  print_stat("Version", env!("CARGO_PKG_VERSION"));
  print_stat("Config dir", &display_dir(config_dir()));
  print_stat("Data dir", &display_dir(data_dir()));
  Ok(())
}

fn display_dir(dir: Option<PathBuf>) -> String {
  dir.map_or_else(|| "unknown (no home directory)".to_string(), |dir| dir.display().to_string())
}
