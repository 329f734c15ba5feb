//! ASCII chart rendering.
//!
//! Each chart writes a framed title, one bar per row scaled against the
//! largest row, and a value column. Empty inputs print a single notice.

use std::io::{self, Write};

use crate::stats::Stats;
use crate::storage::TimelinePoint;
use crate::util::format::{extract_filename, format_seconds, simplify_stack, truncate_chars};
use crate::util::format_size;

const FRAME: &str = "========================================";
const BAR: &str = "█";

fn header(out: &mut dyn Write, title: &str) -> io::Result<()> {
  write!(out, "\n{FRAME}\n  {title}\n{FRAME}\n\n")
}

/// A `width`-column bar filled in proportion to `value / max`.
pub fn bar(value: u64, max: u64, width: usize) -> String {
  let filled = if max == 0 {
    0
  } else {
    ((value as f64 / max as f64) * width as f64) as usize
  };
  let filled = filled.min(width);
  format!("{}{}", BAR.repeat(filled), " ".repeat(width - filled))
}

pub fn function_chart(out: &mut dyn Write, stats: &Stats, limit: usize) -> io::Result<()> {
  let rows = stats.function_stats(limit);
  let Some(max) = rows.first().map(|r| r.total_allocated) else {
    return writeln!(out, "No allocation data available.");
  };

  header(out, "Function Memory Allocation Chart")?;
  for row in &rows {
    writeln!(
      out,
      "{:<25} |{}| {}",
      truncate_chars(&row.function_name, 24),
      bar(row.total_allocated, max, 50),
      format_size(row.total_allocated)
    )?;
  }
  writeln!(out)
}

pub fn size_histogram(out: &mut dyn Write, stats: &Stats) -> io::Result<()> {
  let buckets = stats.size_distribution();
  let Some(max) = buckets.iter().map(|b| b.count as u64).max() else {
    return writeln!(out, "No size distribution data available.");
  };

  header(out, "Size Distribution Histogram")?;
  for bucket in &buckets {
    let upper = if bucket.is_unbounded() {
      "inf".to_string()
    } else {
      format_size(bucket.max_size)
    };
    let label = format!("{}-{}", format_size(bucket.min_size), upper);
    writeln!(
      out,
      "{:<20} |{}| {} allocs",
      label,
      bar(bucket.count as u64, max, 40),
      bucket.count
    )?;
  }
  writeln!(out)
}

/// Bucket times are printed relative to the first bucket.
pub fn timeline(out: &mut dyn Write, points: &[TimelinePoint]) -> io::Result<()> {
  let (Some(first), Some(max)) = (points.first(), points.iter().map(|p| p.memory_usage).max()) else {
    return writeln!(out, "No timeline data available.");
  };

  header(out, "Memory Usage Timeline")?;
  for point in points {
    writeln!(
      out,
      "{:>12} |{}| {}",
      format_seconds(point.timestamp - first.timestamp),
      bar(point.memory_usage, max, 40),
      format_size(point.memory_usage)
    )?;
  }
  write!(out, "\nPeak usage: {}\n\n", format_size(max))
}

pub fn hotspots(out: &mut dyn Write, stats: &Stats, limit: usize) -> io::Result<()> {
  let rows = stats.hotspots(limit);
  let Some(max) = rows.first().map(|(_, size)| *size) else {
    return writeln!(out, "No hotspot data available.");
  };

  header(out, "Memory Hotspots")?;
  for (i, (function, size)) in rows.iter().enumerate() {
    writeln!(
      out,
      "{:>2}. {:<22} |{}| {}",
      i + 1,
      truncate_chars(function, 21),
      bar(*size, max, 45),
      format_size(*size)
    )?;
  }
  writeln!(out)
}

pub fn call_stacks(out: &mut dyn Write, stats: &Stats, limit: usize) -> io::Result<()> {
  let mut stacks: Vec<(String, usize)> = stats.call_stack_stats().into_iter().collect();
  stacks.sort_by(|a, b| b.1.cmp(&a.1));
  if limit > 0 {
    stacks.truncate(limit);
  }
  let Some(max) = stacks.first().map(|(_, count)| *count as u64) else {
    return writeln!(out, "No call stack data available.");
  };

  header(out, "Top Call Stacks by Frequency")?;
  for (i, (stack, count)) in stacks.iter().enumerate() {
    writeln!(
      out,
      "{:>3}. {:<30} |{}| {}",
      i + 1,
      truncate_chars(simplify_stack(stack), 30),
      bar(*count as u64, max, 30),
      count
    )?;
  }
  writeln!(out)
}

pub fn file_chart(out: &mut dyn Write, stats: &Stats, limit: usize) -> io::Result<()> {
  let rows = stats.file_stats(limit);
  let Some(max) = rows.first().map(|r| r.total_allocated) else {
    return writeln!(out, "No file allocation data available.");
  };

  header(out, "File Memory Allocation Chart")?;
  for row in &rows {
    writeln!(
      out,
      "{:<28} |{}| {}",
      truncate_chars(extract_filename(&row.file_path), 27),
      bar(row.total_allocated, max, 40),
      format_size(row.total_allocated)
    )?;
  }
  writeln!(out)
}

/// Summary, top five hotspots and the size histogram.
pub fn dashboard(out: &mut dyn Write, stats: &Stats) -> io::Result<()> {
  header(out, "Realtime Memory Monitor")?;
  writeln!(out, "{}", stats.summary())?;
  hotspots(out, stats, 5)?;
  size_histogram(out, stats)
}
