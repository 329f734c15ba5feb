//! Sample workload traced end to end.
//!
//! Mirrors how an application embeds the tracer: start capture, run code,
//! stop, then hand the records to storage and stats for reporting.

use std::hint::black_box;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use memtrace_lib::capture::Capture;
use memtrace_lib::config::Config;
use memtrace_lib::stats::Stats;
use memtrace_lib::storage::Storage;
use memtrace_lib::util::format_size;
use memtrace_lib::visualization::Visualizer;

use crate::output::{
  OutputFormat, format_allocation, format_duration, print_header, print_info, print_json, print_stat, print_success,
  print_warning,
};

const ROUNDS: usize = 3;
const WORKERS: usize = 4;
const LEAKS_SHOWN: usize = 5;
const CHART_LIMIT: usize = 10;

pub struct DemoOptions {
  /// Dashboard refresh interval when the realtime monitor is on.
  pub monitor: Option<Duration>,
  pub data_dir: PathBuf,
  pub report: PathBuf,
}

#[inline(never)]
fn fill_buffers() {
  let mut data = vec![0i32; 100];
  for (i, slot) in data.iter_mut().enumerate() {
    *slot = i as i32;
  }
  let vec = vec![0i32; 1000];
  let buffer = vec![0u8; 1024];
  black_box((&data, &vec, &buffer));
}

#[inline(never)]
fn build_strings() {
  let floats = vec![0f64; 5000];
  let text = String::from("This is a test string with more data");
  let large = vec![0u8; 4096];
  thread::sleep(Duration::from_millis(10));
  black_box((&floats, &text, &large));
}

#[inline(never)]
fn box_single_value() {
  let value = Box::new(42i32);
  thread::sleep(Duration::from_millis(5));
  black_box(&value);
}

#[inline(never)]
fn churn_small_blocks() {
  for _ in 0..100 {
    black_box(Box::new(0i32));
  }
  for _ in 0..10 {
    black_box(vec![0u8; 256]);
  }
}

/// Leaves one block allocated on purpose.
#[inline(never)]
fn leak_block() {
  let leaked: &'static mut [i32] = Vec::leak(vec![0i32; 50]);
  black_box(leaked);
  let doubles = vec![0f64; 100];
  black_box(&doubles);
}

#[inline(never)]
fn worker(id: usize) {
  for _ in 0..5 {
    let data = vec![0i32; 100 + id * 10];
    thread::sleep(Duration::from_millis(5));
    black_box(&data);
  }
}

fn run_workload() -> Result<()> {
  for _ in 0..ROUNDS {
    fill_buffers();
    build_strings();
    box_single_value();
    churn_small_blocks();
    leak_block();
  }

  let handles: Vec<_> = (0..WORKERS)
    .map(|id| thread::Builder::new().name(format!("worker-{id}")).spawn(move || worker(id)))
    .collect::<io::Result<_>>()
    .context("Failed to spawn worker thread")?;
  for handle in handles {
    if handle.join().is_err() {
      anyhow::bail!("worker thread panicked");
    }
  }
  Ok(())
}

fn draw_charts(visualizer: &Visualizer, bucket_ns: u64) -> Result<()> {
  let stdout = io::stdout();
  let mut out = stdout.lock();
  visualizer.draw_function_chart(&mut out, CHART_LIMIT)?;
  visualizer.draw_size_histogram(&mut out)?;
  visualizer.draw_hotspots(&mut out, CHART_LIMIT)?;
  visualizer.draw_file_chart(&mut out, CHART_LIMIT)?;
  visualizer.draw_call_stacks(&mut out, CHART_LIMIT)?;
  visualizer.draw_timeline(&mut out, bucket_ns)?;
  out.flush()?;
  Ok(())
}

pub fn cmd_demo(options: &DemoOptions, config: &Config, output: OutputFormat) -> Result<()> {
  let started = Instant::now();
  let text = !output.is_json();

  let storage = Arc::new(Storage::new());
  storage.initialize(&options.data_dir)?;
  storage.set_max_allocations(config.max_allocations);
  let stats = Arc::new(Stats::new());
  stats.initialize();
  let visualizer = Visualizer::new(Arc::clone(&stats), Arc::clone(&storage));
  visualizer.initialize();

  let capture = Capture::global();
  capture.initialize(config.max_frames);
  {
    let stats = Arc::clone(&stats);
    capture.set_callback(move |info| stats.add_allocation(info));
  }

  match options.monitor {
    Some(_) if !text => print_warning("--monitor is ignored with --output json"),
    Some(interval) => {
      visualizer.start_monitor(interval, Box::new(io::stdout()));
    }
    None if text => print_info("Running sample workload..."),
    None => {}
  }

  capture.start()?;
  let workload = run_workload();
  capture.stop();
  visualizer.stop_monitor();
  capture.clear_callback();
  workload?;

  // The callback saw allocations as they happened; rebuild from the final
  // records so frees are reflected.
  let allocations = capture.allocations();
  capture.shutdown();
  stats.reset();
  stats.add_allocations(&allocations);
  storage.add_allocations(allocations);
  info!(records = storage.len(), "capture processed");

  storage
    .export_json(&options.report)
    .with_context(|| format!("Failed to export {}", options.report.display()))?;
  let leaks = storage.leaks();
  let report_text = visualizer.export_report_to_text();

  if text {
    print_header("=== Memory Statistics ===");
    draw_charts(&visualizer, config.bucket_ns)?;
    print_header("=== Detailed Report ===");
    print!("{}", report_text);
    print_header("=== Potential Memory Leaks ===");
    println!("Found {} potential memory leaks.", leaks.len());
    for (i, leak) in leaks.iter().take(LEAKS_SHOWN).enumerate() {
      println!("  {}. {}", i + 1, format_allocation(leak));
    }
  }

  let totals = stats.totals();
  let leak_count = leaks.len();
  visualizer.shutdown();
  stats.shutdown();
  let saved = storage.shutdown()?;

  if output.is_json() {
    print_json(&json!({
      "totals": totals,
      "leaks": leak_count,
      "report": options.report,
      "allocations_file": saved,
      "elapsed_ms": started.elapsed().as_millis() as u64,
    }))?;
  } else {
    println!();
    print_success("Demo complete");
    print_stat("Allocations", &totals.total_allocations.to_string());
    print_stat("Allocated", &format_size(totals.total_memory_allocated));
    print_stat("Report", &options.report.display().to_string());
    print_stat("Saved", &saved.display().to_string());
    print_stat("Duration", &format_duration(started.elapsed()));
  }

  Ok(())
}
