use std::path::Path;

use anyhow::Result;
use serde_json::json;

use memtrace_lib::config::Config;
use memtrace_lib::util::format_size;

use super::Session;
use crate::output::{OutputFormat, print_json, print_stat, print_success};

pub fn cmd_summary(input: &Path, config: &Config, output: OutputFormat) -> Result<()> {
  let session = Session::load(input, config)?;
  let summary = session.storage.summary();
  let totals = session.stats.totals();
  let leaks = session.storage.leaks();
  let leaked_bytes = leaks.iter().fold(0u64, |total, a| total.saturating_add(a.size));

  if output.is_json() {
    print_json(&json!({
      "storage": summary,
      "totals": totals,
      "leaks": { "count": leaks.len(), "bytes": leaked_bytes },
    }))?;
  } else {
    print_success(&format!("Loaded {}", input.display()));
    print_stat("Allocations", &summary.total_allocations.to_string());
    print_stat("Total memory", &format_size(totals.total_memory_allocated));
    print_stat("Functions", &summary.unique_functions.to_string());
    print_stat("Files", &totals.unique_files.to_string());
    print_stat("Live", &format!("{} ({})", leaks.len(), format_size(leaked_bytes)));
  }

  Ok(())
}
