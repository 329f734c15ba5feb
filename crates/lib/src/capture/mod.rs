//! Heap allocation capture.
//!
//! [`TracingAllocator`] wraps a [`GlobalAlloc`](std::alloc::GlobalAlloc) and
//! reports every allocation, reallocation and free to the process-wide
//! [`Capture`] recorder. Records carry the originating function, file and
//! line resolved from the call stack, plus the symbolized stack itself.
//!
//! The recorder only keeps records between [`Capture::start`] and
//! [`Capture::stop`]; outside that window the hooks cost one atomic load.

mod allocator;
mod recorder;
mod stack;
mod types;

pub use allocator::TracingAllocator;
pub use recorder::{AllocationCallback, Capture, CaptureError, untraced};
pub use stack::{Frame, capture_frames, resolve_site};
pub use types::{AllocationInfo, AllocationSite, Hook, UNKNOWN};
