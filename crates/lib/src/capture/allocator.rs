//! A global allocator wrapper that feeds the process-wide recorder.
//!
//! ```ignore
//! use std::alloc::System;
//! use memtrace_lib::capture::TracingAllocator;
//!
//! #[global_allocator]
//! static ALLOC: TracingAllocator<System> = TracingAllocator::new(System);
//! ```

use std::alloc::{GlobalAlloc, Layout, System};

use super::recorder::{Capture, is_suppressed, suppressed};
use super::types::Hook;

/// Forwards every request to `A` and reports it to [`Capture::global`].
pub struct TracingAllocator<A = System> {
  inner: A,
}

impl<A> TracingAllocator<A> {
  pub const fn new(inner: A) -> Self {
    Self { inner }
  }
}

/// Skips recording on the fast path and for allocations made by the tracer.
#[inline]
fn should_record() -> bool {
  Capture::global().is_capturing() && !is_suppressed()
}

fn on_alloc(ptr: *mut u8, size: usize, hook: Hook) {
  if !ptr.is_null() && should_record() {
    suppressed(|| Capture::global().record_hooked(ptr as u64, size as u64, hook));
  }
}

fn on_dealloc(ptr: *mut u8) {
  if !ptr.is_null() && should_record() {
    Capture::global().record_deallocation(ptr as u64);
  }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for TracingAllocator<A> {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    let ptr = unsafe { self.inner.alloc(layout) };
    on_alloc(ptr, layout.size(), Hook::Alloc);
    ptr
  }

  unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
    let ptr = unsafe { self.inner.alloc_zeroed(layout) };
    on_alloc(ptr, layout.size(), Hook::AllocZeroed);
    ptr
  }

  unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
    on_dealloc(ptr);
    unsafe { self.inner.dealloc(ptr, layout) };
  }

  unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
    let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };
    if !new_ptr.is_null() {
      on_dealloc(ptr);
      on_alloc(new_ptr, new_size, Hook::Realloc);
    }
    new_ptr
  }
}
