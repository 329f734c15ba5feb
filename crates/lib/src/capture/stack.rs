//! Call-stack capture and origin resolution.

use super::types::{AllocationSite, UNKNOWN};

/// Frames from the tracer itself and the symbolizer.
const INTERNAL_PREFIXES: &[&str] = &[
  "backtrace::",
  "memtrace_lib::capture::",
  "<memtrace_lib::capture::",
  "__rust_",
  "__rdl_",
  "__rg_",
];

/// Runtime frames skipped when picking the allocation origin.
const RUNTIME_PREFIXES: &[&str] = &[
  "std::",
  "core::",
  "alloc::",
  "hashbrown::",
  "<std::",
  "<core::",
  "<alloc::",
  "<hashbrown::",
  "<T as ",
  "<[T]",
];

/// A single symbolized frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  pub function: String,
  pub file: Option<String>,
  pub line: Option<u32>,
}

fn has_prefix(name: &str, prefixes: &[&str]) -> bool {
  prefixes.iter().any(|p| name.starts_with(p))
}

/// Walks and symbolizes the current stack, keeping at most `max_frames`
/// frames outside the tracer.
pub fn capture_frames(max_frames: usize) -> Vec<Frame> {
  let mut frames = Vec::new();
  if max_frames == 0 {
    return frames;
  }

  backtrace::trace(|raw| {
    backtrace::resolve_frame(raw, |symbol| {
      let Some(name) = symbol.name() else {
        return;
      };
      let function = format!("{:#}", name);
      if function.is_empty() || has_prefix(&function, INTERNAL_PREFIXES) {
        return;
      }
      if frames.len() < max_frames {
        frames.push(Frame {
          function,
          file: symbol.filename().map(|p| p.display().to_string()),
          line: symbol.lineno(),
        });
      }
    });
    frames.len() < max_frames
  });

  frames
}

/// Picks the first frame that is neither tracer nor runtime code as the
/// allocation origin. The full frame list becomes the stack trace.
pub fn resolve_site(frames: Vec<Frame>, fallback_function: &str) -> AllocationSite {
  let origin = frames.iter().find(|f| !has_prefix(&f.function, RUNTIME_PREFIXES));

  let site = match origin {
    Some(frame) => AllocationSite::new(
      frame.function.clone(),
      frame.file.clone().unwrap_or_else(|| UNKNOWN.to_string()),
      frame.line.unwrap_or(0),
    ),
    None => AllocationSite::new(fallback_function, UNKNOWN, 0),
  };

  site.with_stack(frames.into_iter().map(|f| f.function).collect())
}
