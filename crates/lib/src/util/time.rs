//! Clock and thread identity helpers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the UNIX epoch.
pub fn timestamp_ns() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_nanos() as u64)
    .unwrap_or_default()
}

/// A stable 32-bit identifier for the calling thread.
pub fn current_thread_id() -> u32 {
  let mut hasher = DefaultHasher::new();
  std::thread::current().id().hash(&mut hasher);
  hasher.finish() as u32
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn thread_id_is_stable_within_a_thread() {
    assert_eq!(current_thread_id(), current_thread_id());
  }

  #[test]
  fn thread_ids_differ_across_threads() {
    let here = current_thread_id();
    let there = std::thread::spawn(current_thread_id).join().unwrap();
    assert_ne!(here, there);
  }
}
