//! Shared utilities.
//!
//! Formatting, clock and thread helpers used across the crate.

pub mod format;
pub mod time;

pub use format::format_size;
pub use time::{current_thread_id, timestamp_ns};
