//! Allocation statistics.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use super::types::{FileStats, FunctionStats, SIZE_BUCKET_EDGES, SizeBucketStats, StatsTotals};
use crate::capture::AllocationInfo;
use crate::consts::{STACK_KEY_DEPTH, STACK_SEPARATOR};
use crate::util::format_size;

/// Functions listed in the report.
const REPORT_TOP_FUNCTIONS: usize = 10;

const RULE: &str = "======================================";

#[derive(Debug, Clone)]
struct Tracking {
  function: String,
  file: String,
  size: u64,
}

#[derive(Debug, Default)]
struct StatsState {
  functions: BTreeMap<String, FunctionStats>,
  files: BTreeMap<String, FileStats>,
  call_stacks: BTreeMap<String, usize>,
  tracking: HashMap<u64, Tracking>,
  total_allocations: usize,
  total_memory_allocated: u64,
}

impl StatsState {
  fn add(&mut self, info: &AllocationInfo) {
    let live = info.is_live();
    let live_size = if live { info.size } else { 0 };

    let function = self
      .functions
      .entry(info.function.clone())
      .or_insert_with(|| FunctionStats {
        function_name: info.function.clone(),
        ..Default::default()
      });
    function.allocation_count += 1;
    function.total_allocated = function.total_allocated.saturating_add(info.size);
    function.current_allocated = function.current_allocated.saturating_add(live_size);
    function.avg_size = function.total_allocated as f64 / function.allocation_count as f64;
    function.peak_allocated = function.peak_allocated.max(info.size);
    *function.size_distribution.entry(info.size).or_default() += 1;

    let file = self.files.entry(info.file.clone()).or_insert_with(|| FileStats {
      file_path: info.file.clone(),
      ..Default::default()
    });
    file.allocation_count += 1;
    file.total_allocated = file.total_allocated.saturating_add(info.size);
    file.current_allocated = file.current_allocated.saturating_add(live_size);
    *file.function_counts.entry(info.function.clone()).or_default() += 1;

    if let Some(key) = stack_key(&info.stack_trace) {
      *self.call_stacks.entry(key).or_default() += 1;
    }

    self.total_allocations += 1;
    self.total_memory_allocated = self.total_memory_allocated.saturating_add(info.size);

    if live {
      self.tracking.insert(
        info.address,
        Tracking {
          function: info.function.clone(),
          file: info.file.clone(),
          size: info.size,
        },
      );
    }
  }

  fn function_stats(&self, limit: usize) -> Vec<FunctionStats> {
    let mut result: Vec<_> = self.functions.values().cloned().collect();
    result.sort_by(|a, b| b.total_allocated.cmp(&a.total_allocated));
    truncate(&mut result, limit);
    result
  }

  fn size_distribution(&self) -> Vec<SizeBucketStats> {
    let mut buckets: Vec<_> = SIZE_BUCKET_EDGES
      .iter()
      .enumerate()
      .map(|(i, &min)| SizeBucketStats::new(min, SIZE_BUCKET_EDGES.get(i + 1).copied().unwrap_or(u64::MAX)))
      .collect();

    for stats in self.functions.values() {
      for (&size, &count) in &stats.size_distribution {
        if let Some(bucket) = buckets.iter_mut().find(|b| b.contains(size)) {
          bucket.count += count;
          bucket.total_size = bucket.total_size.saturating_add(size.saturating_mul(count as u64));
        }
      }
    }

    buckets.retain(|b| b.count > 0);
    buckets
  }

  fn totals(&self) -> StatsTotals {
    StatsTotals {
      total_allocations: self.total_allocations,
      total_memory_allocated: self.total_memory_allocated,
      unique_functions: self.functions.len(),
      unique_files: self.files.len(),
    }
  }
}

/// Joins the innermost frames into a call-stack key.
fn stack_key(stack_trace: &[String]) -> Option<String> {
  if stack_trace.is_empty() {
    return None;
  }
  Some(
    stack_trace
      .iter()
      .take(STACK_KEY_DEPTH)
      .map(String::as_str)
      .collect::<Vec<_>>()
      .join(STACK_SEPARATOR),
  )
}

/// A `limit` of zero keeps everything.
fn truncate<T>(items: &mut Vec<T>, limit: usize) {
  if limit > 0 {
    items.truncate(limit);
  }
}

/// Thread-safe statistics over allocation records.
#[derive(Debug, Default)]
pub struct Stats {
  state: Mutex<StatsState>,
}

impl Stats {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, StatsState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn initialize(&self) {
    info!("stats initialized");
  }

  pub fn shutdown(&self) {
    self.reset();
    info!("stats shutdown");
  }

  pub fn add_allocation(&self, info: &AllocationInfo) {
    self.lock().add(info);
  }

  pub fn add_allocations<'a, I>(&self, allocations: I)
  where
    I: IntoIterator<Item = &'a AllocationInfo>,
  {
    let mut state = self.lock();
    for info in allocations {
      state.add(info);
    }
  }

  /// Subtracts a tracked live allocation from its function and file.
  pub fn record_deallocation(&self, address: u64) {
    let mut state = self.lock();
    let Some(tracking) = state.tracking.remove(&address) else {
      return;
    };
    if let Some(function) = state.functions.get_mut(&tracking.function) {
      function.current_allocated = function.current_allocated.saturating_sub(tracking.size);
    }
    if let Some(file) = state.files.get_mut(&tracking.file) {
      file.current_allocated = file.current_allocated.saturating_sub(tracking.size);
    }
  }

  /// Per-function stats sorted by total bytes, largest first.
  pub fn function_stats(&self, limit: usize) -> Vec<FunctionStats> {
    self.lock().function_stats(limit)
  }

  /// Stats for one function; zeroed stats if it never allocated.
  pub fn function(&self, function_name: &str) -> FunctionStats {
    self.lock().functions.get(function_name).cloned().unwrap_or_else(|| FunctionStats {
      function_name: function_name.to_string(),
      ..Default::default()
    })
  }

  /// Per-file stats sorted by total bytes, largest first.
  pub fn file_stats(&self, limit: usize) -> Vec<FileStats> {
    let mut result: Vec<_> = self.lock().files.values().cloned().collect();
    result.sort_by(|a, b| b.total_allocated.cmp(&a.total_allocated));
    truncate(&mut result, limit);
    result
  }

  /// Non-empty size buckets in ascending order.
  pub fn size_distribution(&self) -> Vec<SizeBucketStats> {
    self.lock().size_distribution()
  }

  /// `(function, total bytes)` pairs, largest first.
  pub fn hotspots(&self, limit: usize) -> Vec<(String, u64)> {
    self
      .function_stats(limit)
      .into_iter()
      .map(|s| (s.function_name, s.total_allocated))
      .collect()
  }

  /// How often each call-stack key was seen.
  pub fn call_stack_stats(&self) -> BTreeMap<String, usize> {
    self.lock().call_stacks.clone()
  }

  pub fn totals(&self) -> StatsTotals {
    self.lock().totals()
  }

  pub fn generate_report(&self) -> String {
    let state = self.lock();
    let totals = state.totals();
    let mut out = String::new();

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "       Memory Tracer Report");
    let _ = writeln!(out, "{RULE}\n");
    let _ = writeln!(out, "Total Allocations: {}", totals.total_allocations);
    let _ = writeln!(out, "Total Memory Allocated: {}", format_size(totals.total_memory_allocated));
    let _ = writeln!(out, "Unique Functions: {}", totals.unique_functions);
    let _ = writeln!(out, "Unique Files: {}\n", totals.unique_files);

    let _ = writeln!(out, "--- Top {REPORT_TOP_FUNCTIONS} Functions by Allocation Size ---");
    for (i, stats) in state.function_stats(REPORT_TOP_FUNCTIONS).iter().enumerate() {
      let _ = writeln!(out, "{}. {}", i + 1, stats.function_name);
      let _ = writeln!(out, "   Allocations: {}", stats.allocation_count);
      let _ = writeln!(out, "   Total: {}", format_size(stats.total_allocated));
      let _ = writeln!(out, "   Current: {}", format_size(stats.current_allocated));
      let _ = writeln!(out, "   Avg: {}", format_size(stats.avg_size as u64));
    }

    let _ = writeln!(out, "\n--- Size Distribution ---");
    for bucket in state.size_distribution() {
      let upper = if bucket.is_unbounded() {
        "inf".to_string()
      } else {
        format_size(bucket.max_size)
      };
      let _ = writeln!(
        out,
        "[{}, {}): {} allocs, {}",
        format_size(bucket.min_size),
        upper,
        bucket.count,
        format_size(bucket.total_size)
      );
    }

    let _ = writeln!(out, "\n{RULE}");
    out
  }

  /// Three-line overview used by the realtime dashboard.
  pub fn summary(&self) -> String {
    let totals = self.totals();
    format!(
      "Total allocations: {}\nTotal memory: {}\nFunctions: {}\n",
      totals.total_allocations,
      format_size(totals.total_memory_allocated),
      totals.unique_functions
    )
  }

  pub fn reset(&self) {
    *self.lock() = StatsState::default();
  }
}
