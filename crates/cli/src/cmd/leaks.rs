use std::path::Path;

use anyhow::Result;
use serde_json::json;

use memtrace_lib::config::Config;

use super::Session;
use crate::output::{OutputFormat, format_allocation, print_info, print_json, print_success};

pub fn cmd_leaks(input: &Path, limit: usize, config: &Config, output: OutputFormat) -> Result<()> {
  let session = Session::load(input, config)?;
  let leaks = session.storage.leaks();
  let shown = if limit == 0 { leaks.len() } else { limit.min(leaks.len()) };

  if output.is_json() {
    print_json(&json!({
      "count": leaks.len(),
      "total_size": leaks.iter().fold(0u64, |total, a| total.saturating_add(a.size)),
      "allocations": &leaks[..shown],
    }))?;
    return Ok(());
  }

  if leaks.is_empty() {
    print_success("No potential memory leaks found.");
    return Ok(());
  }

  print_info(&format!("Found {} potential memory leaks.", leaks.len()));
  for (i, leak) in leaks.iter().take(shown).enumerate() {
    println!("  {}. {}", i + 1, format_allocation(leak));
  }
  if shown < leaks.len() {
    println!("  ... and {} more", leaks.len() - shown);
  }

  Ok(())
}
