use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use clap::ValueEnum;
use serde_json::json;

use memtrace_lib::config::Config;
use memtrace_lib::visualization::ChartKind;

use super::Session;
use crate::output::{OutputFormat, print_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartArg {
  /// Bytes allocated per function
  Function,
  /// Allocation count per size bucket
  Size,
  /// Live bytes over time
  Timeline,
  /// Functions ranked by bytes allocated
  Hotspots,
  /// Most frequent call stacks
  Stacks,
  /// Bytes allocated per source file
  Files,
}

impl From<ChartArg> for ChartKind {
  fn from(arg: ChartArg) -> Self {
    match arg {
      ChartArg::Function => ChartKind::Function,
      ChartArg::Size => ChartKind::SizeHistogram,
      ChartArg::Timeline => ChartKind::Timeline,
      ChartArg::Hotspots => ChartKind::Hotspots,
      ChartArg::Stacks => ChartKind::CallStacks,
      ChartArg::Files => ChartKind::Files,
    }
  }
}

pub fn cmd_chart(
  input: &Path,
  kind: ChartArg,
  limit: usize,
  bucket_ns: u64,
  config: &Config,
  output: OutputFormat,
) -> Result<()> {
  let session = Session::load(input, config)?;
  let visualizer = session.visualizer();

  if output.is_json() {
    let chart = visualizer.export_to_text(kind.into(), limit, bucket_ns)?;
    print_json(&json!({ "kind": format!("{:?}", kind).to_lowercase(), "chart": chart }))?;
  } else {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    visualizer.draw(&mut out, kind.into(), limit, bucket_ns)?;
    out.flush()?;
  }

  Ok(())
}
