use serde::{Deserialize, Serialize};

/// Placeholder for a function or file that could not be resolved.
pub const UNKNOWN: &str = "unknown";

/// One intercepted heap allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationInfo {
  /// Nanoseconds since the UNIX epoch when the allocation was recorded.
  pub timestamp: u64,
  pub address: u64,
  pub size: u64,
  pub function: String,
  pub file: String,
  pub line: u32,
  pub thread_id: u32,
  #[serde(default)]
  pub stack_trace: Vec<String>,
  /// Set when the matching deallocation was observed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub freed_at: Option<u64>,
}

impl AllocationInfo {
  /// True while no deallocation has been observed for this record.
  pub fn is_live(&self) -> bool {
    self.freed_at.is_none()
  }

  /// Builds a live record stamped with the current time and thread.
  pub fn new(address: u64, size: u64, site: AllocationSite) -> Self {
    Self {
      timestamp: crate::util::timestamp_ns(),
      address,
      size,
      function: site.function,
      file: site.file,
      line: site.line,
      thread_id: crate::util::current_thread_id(),
      stack_trace: site.stack_trace,
      freed_at: None,
    }
  }
}

impl Default for AllocationInfo {
  fn default() -> Self {
    Self {
      timestamp: 0,
      address: 0,
      size: 0,
      function: UNKNOWN.to_string(),
      file: UNKNOWN.to_string(),
      line: 0,
      thread_id: 0,
      stack_trace: Vec::new(),
      freed_at: None,
    }
  }
}

/// Where an allocation came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationSite {
  pub function: String,
  pub file: String,
  pub line: u32,
  pub stack_trace: Vec<String>,
}

impl AllocationSite {
  pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
    Self {
      function: function.into(),
      file: file.into(),
      line,
      stack_trace: Vec::new(),
    }
  }

  pub fn with_stack(mut self, stack_trace: Vec<String>) -> Self {
    self.stack_trace = stack_trace;
    self
  }
}

impl Default for AllocationSite {
  fn default() -> Self {
    Self::new(UNKNOWN, UNKNOWN, 0)
  }
}

/// Allocator entry point that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
  Alloc,
  AllocZeroed,
  Realloc,
}

impl Hook {
  pub fn as_str(&self) -> &'static str {
    match self {
      Hook::Alloc => "alloc",
      Hook::AllocZeroed => "alloc_zeroed",
      Hook::Realloc => "realloc",
    }
  }
}
