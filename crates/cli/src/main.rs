mod cmd;
mod output;

use std::alloc::System;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use memtrace_lib::capture::TracingAllocator;
use memtrace_lib::config::Config;
use memtrace_lib::logging::{self, LogLevel};

use cmd::{ChartArg, QueryArgs, RecipeCommand};
use output::{OutputFormat, print_error};

#[global_allocator]
static ALLOCATOR: TracingAllocator<System> = TracingAllocator::new(System);

/// memtrace - heap allocation tracer
#[derive(Parser)]
#[command(name = "memtrace")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  /// Log level (trace, debug, info, warn, error, fatal)
  #[arg(long, global = true)]
  log_level: Option<LogLevel>,

  /// Also write logs to this file
  #[arg(long, global = true)]
  log_file: Option<PathBuf>,

  /// Configuration file (default: <config_dir>/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Trace a sample multi-threaded workload and report on it
  Demo {
    /// Show the realtime dashboard while the workload runs
    #[arg(long)]
    monitor: bool,

    /// Dashboard refresh interval (e.g. 250ms, 1s)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "500ms")]
    interval: Duration,

    /// Directory for allocations.json (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Path of the exported JSON report
    #[arg(long, default_value = "memory_report.json")]
    report: PathBuf,
  },

  /// Print the full statistics report for an allocations file
  Report {
    /// Exported allocations file
    input: PathBuf,
  },

  /// Print a short summary of an allocations file
  Summary {
    /// Exported allocations file
    input: PathBuf,
  },

  /// List allocations that were never freed
  Leaks {
    /// Exported allocations file
    input: PathBuf,

    /// Maximum number of leaks to list (0 = all)
    #[arg(short, long, default_value_t = 10)]
    limit: usize,
  },

  /// Draw one chart for an allocations file
  Chart {
    /// Exported allocations file
    input: PathBuf,

    /// Chart to draw
    #[arg(short, long, value_enum, default_value_t = ChartArg::Function)]
    kind: ChartArg,

    /// Maximum number of rows
    #[arg(short, long, default_value_t = 10)]
    limit: usize,

    /// Timeline bucket width (e.g. 100ms, 1s); defaults to the configured width
    #[arg(long, value_parser = humantime::parse_duration)]
    bucket: Option<Duration>,
  },

  /// Query stored allocations by function, file, size or time
  Query(QueryArgs),

  /// Inspect and drive the package recipe
  Recipe {
    #[command(subcommand)]
    command: RecipeCommand,
  },

  /// Show host platform information
  Info,
}

fn load_config(cli: &Cli) -> Result<Config> {
  let mut config = Config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
  if let Some(level) = cli.log_level {
    config.log_level = level;
  } else if cli.verbose {
    config.log_level = LogLevel::Debug;
  }
  if let Some(file) = &cli.log_file {
    config.log_file = Some(file.clone());
  }
  Ok(config)
}

fn run(cli: Cli) -> Result<()> {
  let config = load_config(&cli)?;
  let _logging = logging::init(&config.logging()).context("Failed to initialize logging")?;
  tracing::debug!(config = ?config, "configuration loaded");

  let output = cli.output;
  match cli.command {
    Commands::Demo {
      monitor,
      interval,
      data_dir,
      report,
    } => {
      let options = cmd::DemoOptions {
        monitor: monitor.then_some(interval),
        data_dir: data_dir.unwrap_or_else(|| config.data_dir.clone()),
        report,
      };
      cmd::cmd_demo(&options, &config, output)
    }
    Commands::Report { input } => cmd::cmd_report(&input, &config, output),
    Commands::Summary { input } => cmd::cmd_summary(&input, &config, output),
    Commands::Leaks { input, limit } => cmd::cmd_leaks(&input, limit, &config, output),
    Commands::Chart {
      input,
      kind,
      limit,
      bucket,
    } => {
      let bucket_ns = bucket.map_or(config.bucket_ns, |b| b.as_nanos() as u64);
      cmd::cmd_chart(&input, kind, limit, bucket_ns, &config, output)
    }
    Commands::Query(args) => cmd::cmd_query(&args, &config, output),
    Commands::Recipe { command } => cmd::cmd_recipe(command, cli.verbose, output),
    Commands::Info => cmd::cmd_info(output),
  }
}

fn main() {
  let cli = Cli::parse();
  if let Err(e) = run(cli) {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
