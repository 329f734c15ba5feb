use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{ArgGroup, Args};

use memtrace_lib::config::Config;
use memtrace_lib::storage::QueryResult;
use memtrace_lib::util::format_size;

use super::Session;
use crate::output::{OutputFormat, format_allocation, print_info, print_json, print_stat};

#[derive(Debug, Args)]
#[command(group(
  ArgGroup::new("filter")
    .required(true)
    .multiple(true)
    .args(["function", "file", "min_size", "max_size", "from", "to"])
))]
pub struct QueryArgs {
  /// Exported allocations file
  pub input: PathBuf,

  /// Live allocations made by this function
  #[arg(long, conflicts_with_all = ["file", "min_size", "max_size", "from", "to"])]
  pub function: Option<String>,

  /// Live allocations made from this source file
  #[arg(long, conflicts_with_all = ["min_size", "max_size", "from", "to"])]
  pub file: Option<String>,

  /// Live allocations of at least this many bytes
  #[arg(long, conflicts_with_all = ["from", "to"])]
  pub min_size: Option<u64>,

  /// Live allocations of at most this many bytes
  #[arg(long, conflicts_with_all = ["from", "to"])]
  pub max_size: Option<u64>,

  /// Allocations recorded at or after this timestamp (ns since epoch)
  #[arg(long)]
  pub from: Option<u64>,

  /// Allocations recorded at or before this timestamp (ns since epoch)
  #[arg(long)]
  pub to: Option<u64>,

  /// Maximum number of matching allocations to list (0 = all)
  #[arg(short, long, default_value_t = 20)]
  pub limit: usize,
}

fn run_query(session: &Session, args: &QueryArgs) -> Result<(String, QueryResult)> {
  let storage = &session.storage;
  if let Some(function) = &args.function {
    return Ok((format!("function {}", function), storage.query_by_function(function)));
  }
  if let Some(file) = &args.file {
    return Ok((format!("file {}", file), storage.query_by_file(file)));
  }
  if args.min_size.is_some() || args.max_size.is_some() {
    let min = args.min_size.unwrap_or(0);
    let max = args.max_size.unwrap_or(u64::MAX);
    if min > max {
      bail!("--min-size ({}) is larger than --max-size ({})", min, max);
    }
    return Ok((format!("size [{}, {}]", min, max), storage.query_by_size_range(min, max)));
  }
  let start = args.from.unwrap_or(0);
  let end = args.to.unwrap_or(u64::MAX);
  if start > end {
    bail!("--from ({}) is later than --to ({})", start, end);
  }
  Ok((format!("time [{}, {}]", start, end), storage.query_by_time_range(start, end)))
}

pub fn cmd_query(args: &QueryArgs, config: &Config, output: OutputFormat) -> Result<()> {
  let session = Session::load(&args.input, config)?;
  let (label, mut result) = run_query(&session, args)?;

  if args.limit > 0 {
    result.allocations.truncate(args.limit);
  }

  if output.is_json() {
    return print_json(&result);
  }

  print_info(&format!("Query by {}", label));
  print_stat("Matches", &result.total_count.to_string());
  print_stat("Total size", &format_size(result.total_size));
  print_stat("Largest", &format_size(result.peak_usage));
  if !result.allocations.is_empty() {
    println!();
    for info in &result.allocations {
      println!("  {}", format_allocation(info));
    }
  }
  Ok(())
}
