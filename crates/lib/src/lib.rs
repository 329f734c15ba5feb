//! memtrace-lib: heap allocation tracing and the memory tracer package recipe
//!
//! This crate provides:
//! - `capture`: a `GlobalAlloc` wrapper recording allocations with call sites
//! - `storage`: indexed in-memory records with JSON persistence
//! - `stats`: per-function, per-file and size-bucket aggregation
//! - `visualization`: ASCII charts and a realtime dashboard
//! - `recipe`: the package recipe (dependencies, options, configure, imports)

pub mod capture;
pub mod config;
pub mod consts;
pub mod logging;
pub mod platform;
pub mod recipe;
pub mod stats;
pub mod storage;
pub mod util;
pub mod visualization;
