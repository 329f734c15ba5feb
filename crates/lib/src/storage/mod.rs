//! Allocation storage.
//!
//! Keeps captured records in memory with lookups by function, file, size
//! and time, and persists them as JSON.
//!
//! # Storage Layout
//!
//! ```text
//! {data_dir}/
//! └── allocations.json    # AllocationDocument written on shutdown
//! ```

mod store;
mod types;

pub use store::{Storage, read_document};
pub use types::{
  AllocationDocument, FunctionTotals, QueryResult, StorageError, StorageSummary, TimelinePoint,
};
