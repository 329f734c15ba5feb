//! The allocation recorder.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, info};

use super::stack::{capture_frames, resolve_site};
use super::types::{AllocationInfo, AllocationSite, Hook};
use crate::consts::DEFAULT_MAX_FRAMES;

/// Invoked after every new allocation record.
pub type AllocationCallback = Box<dyn Fn(&AllocationInfo) + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
  #[error("capture has not been initialized")]
  NotInitialized,
}

thread_local! {
  static SUPPRESSED: Cell<bool> = const { Cell::new(false) };
}

/// Runs `f` with recording disabled on the current thread.
///
/// Every path that allocates while the recorder's lock is held goes through
/// here, otherwise the allocator hook would re-enter the lock.
pub(crate) fn suppressed<R>(f: impl FnOnce() -> R) -> R {
  let previous = SUPPRESSED.with(|s| s.replace(true));
  let result = f();
  SUPPRESSED.with(|s| s.set(previous));
  result
}

/// Runs `f` on the current thread without recording its allocations.
///
/// Code that reads tracer state (stats, storage) while capture is live must
/// run inside this, or an allocation made under a reader's lock reaches the
/// callback and blocks on that same lock.
pub fn untraced<R>(f: impl FnOnce() -> R) -> R {
  suppressed(f)
}

pub(crate) fn is_suppressed() -> bool {
  SUPPRESSED.with(|s| s.get())
}

#[derive(Debug, Default)]
struct CaptureState {
  allocations: Vec<AllocationInfo>,
  /// Address of every live record mapped to its index in `allocations`.
  active: BTreeMap<u64, usize>,
}

/// Records allocations and deallocations while capturing is on.
pub struct Capture {
  initialized: AtomicBool,
  capturing: AtomicBool,
  max_frames: AtomicUsize,
  state: Mutex<CaptureState>,
  callback: RwLock<Option<AllocationCallback>>,
}

static GLOBAL: Capture = Capture::new();

impl Capture {
  pub const fn new() -> Self {
    Self {
      initialized: AtomicBool::new(false),
      capturing: AtomicBool::new(false),
      max_frames: AtomicUsize::new(DEFAULT_MAX_FRAMES),
      state: Mutex::new(CaptureState {
        allocations: Vec::new(),
        active: BTreeMap::new(),
      }),
      callback: RwLock::new(None),
    }
  }

  /// The process-wide recorder fed by [`TracingAllocator`](super::TracingAllocator).
  pub fn global() -> &'static Capture {
    &GLOBAL
  }

  fn lock(&self) -> MutexGuard<'_, CaptureState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn with_state<R>(&self, f: impl FnOnce(&mut CaptureState) -> R) -> R {
    suppressed(|| f(&mut self.lock()))
  }

  /// Prepares the recorder. `max_frames` bounds the captured stack depth.
  pub fn initialize(&self, max_frames: usize) {
    self.max_frames.store(max_frames, Ordering::SeqCst);
    self.initialized.store(true, Ordering::SeqCst);
    suppressed(|| info!(max_frames, "memory capture initialized"));
  }

  pub fn is_initialized(&self) -> bool {
    self.initialized.load(Ordering::SeqCst)
  }

  /// Stops capturing and drops every record.
  pub fn shutdown(&self) {
    self.stop();
    self.clear();
    self.initialized.store(false, Ordering::SeqCst);
    suppressed(|| info!("memory capture shutdown"));
  }

  pub fn start(&self) -> Result<(), CaptureError> {
    if !self.is_initialized() {
      return Err(CaptureError::NotInitialized);
    }
    suppressed(|| info!("memory capture started"));
    self.capturing.store(true, Ordering::SeqCst);
    Ok(())
  }

  pub fn stop(&self) {
    if self.capturing.swap(false, Ordering::SeqCst) {
      suppressed(|| info!("memory capture stopped"));
    }
  }

  pub fn is_capturing(&self) -> bool {
    self.capturing.load(Ordering::SeqCst)
  }

  /// A copy of every record captured so far, in capture order.
  pub fn allocations(&self) -> Vec<AllocationInfo> {
    self.with_state(|state| state.allocations.clone())
  }

  /// Number of records whose deallocation has not been observed.
  pub fn live_count(&self) -> usize {
    self.with_state(|state| state.active.len())
  }

  pub fn clear(&self) {
    self.with_state(|state| {
      state.allocations.clear();
      state.active.clear();
    });
  }

  pub fn set_callback(&self, callback: impl Fn(&AllocationInfo) + Send + Sync + 'static) {
    let callback: AllocationCallback = suppressed(|| Box::new(callback));
    let mut slot = self.callback.write().unwrap_or_else(PoisonError::into_inner);
    *slot = Some(callback);
  }

  pub fn clear_callback(&self) {
    let previous = {
      let mut slot = self.callback.write().unwrap_or_else(PoisonError::into_inner);
      slot.take()
    };
    suppressed(|| drop(previous));
  }

  /// Records an allocation at an explicit site. Ignored unless capturing.
  pub fn record_allocation(&self, address: u64, size: u64, site: AllocationSite) {
    if !self.is_capturing() {
      return;
    }
    suppressed(|| self.push(AllocationInfo::new(address, size, site)));
  }

  /// Marks the live record at `address` as freed. Unknown addresses are ignored.
  pub fn record_deallocation(&self, address: u64) {
    if !self.is_capturing() {
      return;
    }
    let freed_at = crate::util::timestamp_ns();
    self.with_state(|state| {
      if let Some(index) = state.active.remove(&address) {
        state.allocations[index].freed_at = Some(freed_at);
      }
    });
  }

  /// Records a reallocation as a free of `old` followed by a new allocation.
  pub fn record_reallocation(&self, old: u64, new: u64, size: u64, site: AllocationSite) {
    if old != 0 {
      self.record_deallocation(old);
    }
    if new != 0 {
      self.record_allocation(new, size, site);
    }
  }

  /// Entry point for the allocator hooks. Captures the call stack to find
  /// where the allocation originated. Must run with recording suppressed.
  pub(crate) fn record_hooked(&self, address: u64, size: u64, hook: Hook) {
    if !self.is_capturing() {
      return;
    }
    let frames = capture_frames(self.max_frames.load(Ordering::Relaxed));
    let site = resolve_site(frames, hook.as_str());
    self.push(AllocationInfo::new(address, size, site));
  }

  fn push(&self, info: AllocationInfo) {
    let notify = {
      let mut state = self.lock();
      // A fresh allocation at an address still marked live means the free
      // happened while capture was paused.
      if let Some(stale) = state.active.remove(&info.address) {
        debug!(address = info.address, "replacing stale live record");
        state.allocations[stale].freed_at = Some(info.timestamp);
      }
      let index = state.allocations.len();
      state.active.insert(info.address, index);
      state.allocations.push(info.clone());
      info
    };

    let callback = self.callback.read().unwrap_or_else(PoisonError::into_inner);
    if let Some(callback) = callback.as_ref() {
      callback(&notify);
    }
  }
}

impl Default for Capture {
  fn default() -> Self {
    Self::new()
  }
}
