use std::collections::BTreeMap;

use serde::Serialize;

/// Aggregates for every allocation attributed to one function.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunctionStats {
  pub function_name: String,
  pub allocation_count: usize,
  pub total_allocated: u64,
  /// Bytes still live.
  pub current_allocated: u64,
  /// Largest single allocation.
  pub peak_allocated: u64,
  pub avg_size: f64,
  /// Exact allocation size mapped to how often it occurred.
  pub size_distribution: BTreeMap<u64, usize>,
}

/// Aggregates for every allocation attributed to one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
  pub file_path: String,
  pub allocation_count: usize,
  pub total_allocated: u64,
  pub current_allocated: u64,
  pub function_counts: BTreeMap<String, usize>,
}

/// One half-open `[min_size, max_size)` size bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SizeBucketStats {
  pub min_size: u64,
  pub max_size: u64,
  pub count: usize,
  pub total_size: u64,
}

impl SizeBucketStats {
  pub fn new(min_size: u64, max_size: u64) -> Self {
    Self {
      min_size,
      max_size,
      count: 0,
      total_size: 0,
    }
  }

  pub fn contains(&self, size: u64) -> bool {
    size >= self.min_size && size < self.max_size
  }

  /// The last bucket has no upper bound.
  pub fn is_unbounded(&self) -> bool {
    self.max_size == u64::MAX
  }
}

/// Lower edges of the fixed size buckets; each bucket ends where the next
/// begins and the last one is unbounded.
pub const SIZE_BUCKET_EDGES: [u64; 11] = [0, 16, 32, 64, 128, 256, 512, 1024, 4096, 16384, 65536];

/// Process-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsTotals {
  pub total_allocations: usize,
  pub total_memory_allocated: u64,
  pub unique_functions: usize,
  pub unique_files: usize,
}
