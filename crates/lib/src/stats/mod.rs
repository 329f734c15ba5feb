//! Allocation statistics by function, file, size and call stack.

mod aggregator;
mod types;

pub use aggregator::Stats;
pub use types::{FileStats, FunctionStats, SIZE_BUCKET_EDGES, SizeBucketStats, StatsTotals};
