/// Application name used for config/data directories.
pub const APP_NAME: &str = "memtrace";

/// Configuration file name inside the config directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Storage directory used when none is configured.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// File written by `Storage::shutdown` inside the data directory.
pub const ALLOCATIONS_FILENAME: &str = "allocations.json";

/// Upper bound on stored records before the oldest are evicted.
pub const DEFAULT_MAX_ALLOCATIONS: usize = 1_000_000;

/// Frames captured per allocation.
pub const DEFAULT_MAX_FRAMES: usize = 32;

/// Timeline bucket width: one second.
pub const DEFAULT_BUCKET_NS: u64 = 1_000_000_000;

/// Frames kept when building a call-stack key.
pub const STACK_KEY_DEPTH: usize = 5;

/// Separator between frames in a call-stack key.
pub const STACK_SEPARATOR: &str = " <- ";
