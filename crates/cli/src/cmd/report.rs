use std::path::Path;

use anyhow::Result;
use serde_json::json;

use memtrace_lib::config::Config;

use super::Session;
use crate::output::{OutputFormat, print_json};

pub fn cmd_report(input: &Path, config: &Config, output: OutputFormat) -> Result<()> {
  let session = Session::load(input, config)?;

  if output.is_json() {
    let report = json!({
      "totals": session.stats.totals(),
      "functions": session.stats.function_stats(0),
      "files": session.stats.file_stats(0),
      "size_distribution": session.stats.size_distribution(),
      "call_stacks": session.stats.call_stack_stats(),
    });
    print_json(&report)?;
  } else {
    print!("{}", session.visualizer().export_report_to_text());
  }

  Ok(())
}
