//! Human-readable rendering helpers shared by stats and charts.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Formats a byte count with two decimals on a 1024 base (e.g. `1.50 KB`).
pub fn format_size(size: u64) -> String {
  let mut value = size as f64;
  let mut unit = 0;

  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }

  format!("{:.2} {}", value, UNITS[unit])
}

/// Formats a nanosecond timestamp as seconds with one decimal (e.g. `1.5s`).
pub fn format_seconds(ns: u64) -> String {
  format!("{:.1}s", ns as f64 / 1e9)
}

/// Returns the last path component, accepting both `/` and `\` separators.
pub fn extract_filename(path: &str) -> &str {
  path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Keeps only the last frame of a `" <- "`-joined stack key.
pub fn simplify_stack(stack: &str) -> &str {
  match stack.rfind(crate::consts::STACK_SEPARATOR) {
    Some(pos) => &stack[pos + crate::consts::STACK_SEPARATOR.len()..],
    None => stack,
  }
}

/// Truncates to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
  match s.char_indices().nth(max) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_size_scales_units() {
    assert_eq!(format_size(0), "0.00 B");
    assert_eq!(format_size(500), "500.00 B");
    assert_eq!(format_size(1536), "1.50 KB");
    assert_eq!(format_size(1024 * 1024), "1.00 MB");
    assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
  }

  #[test]
  fn format_size_caps_at_terabytes() {
    let pb = 1024u64.pow(5);
    assert_eq!(format_size(pb), "1024.00 TB");
  }

  #[test]
  fn format_seconds_one_decimal() {
    assert_eq!(format_seconds(1_500_000_000), "1.5s");
    assert_eq!(format_seconds(0), "0.0s");
  }

  #[test]
  fn extract_filename_handles_both_separators() {
    assert_eq!(extract_filename("/src/a/main.rs"), "main.rs");
    assert_eq!(extract_filename("C:\\src\\lib.rs"), "lib.rs");
    assert_eq!(extract_filename("plain.rs"), "plain.rs");
  }

  #[test]
  fn simplify_stack_keeps_last_frame() {
    assert_eq!(simplify_stack("a <- b <- c"), "c");
    assert_eq!(simplify_stack("single"), "single");
  }

  #[test]
  fn truncate_chars_respects_code_points() {
    assert_eq!(truncate_chars("héllo", 2), "hé");
    assert_eq!(truncate_chars("abc", 10), "abc");
  }
}
