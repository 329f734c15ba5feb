use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::AllocationInfo;

/// Records matched by a storage query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryResult {
  pub allocations: Vec<AllocationInfo>,
  pub total_count: usize,
  pub total_size: u64,
  /// Largest single allocation in `allocations`.
  pub peak_usage: u64,
}

impl QueryResult {
  pub(crate) fn push(&mut self, info: &AllocationInfo, count_size: bool) {
    self.allocations.push(info.clone());
    self.total_count += 1;
    if count_size {
      self.total_size = self.total_size.saturating_add(info.size);
    }
  }

  pub(crate) fn finish(mut self) -> Self {
    self.peak_usage = self.allocations.iter().map(|a| a.size).max().unwrap_or(0);
    self
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FunctionTotals {
  pub count: usize,
  pub total_size: u64,
}

/// Overview of everything currently stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageSummary {
  pub total_allocations: usize,
  pub unique_functions: usize,
  pub data_dir: PathBuf,
  pub by_function: BTreeMap<String, FunctionTotals>,
}

/// Live bytes allocated within one timeline bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
  pub timestamp: u64,
  pub memory_usage: u64,
}

/// On-disk export format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDocument {
  #[serde(default)]
  pub allocations: Vec<AllocationInfo>,
}

#[derive(Debug, Error)]
pub enum StorageError {
  #[error("failed to create data directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize allocations: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("timeline bucket size must be greater than zero")]
  InvalidBucketSize,
}
