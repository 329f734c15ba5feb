mod chart;
mod demo;
mod info;
mod leaks;
mod query;
mod recipe;
mod report;
mod summary;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use memtrace_lib::config::Config;
use memtrace_lib::stats::Stats;
use memtrace_lib::storage::{Storage, read_document};
use memtrace_lib::visualization::Visualizer;

pub use chart::{ChartArg, cmd_chart};
pub use demo::{DemoOptions, cmd_demo};
pub use info::cmd_info;
pub use leaks::cmd_leaks;
pub use query::{QueryArgs, cmd_query};
pub use recipe::{RecipeCommand, cmd_recipe};
pub use report::cmd_report;
pub use summary::cmd_summary;

/// Storage and stats rebuilt from an exported allocations file.
pub struct Session {
  pub storage: Arc<Storage>,
  pub stats: Arc<Stats>,
}

impl Session {
  pub fn load(path: &Path, config: &Config) -> Result<Self> {
    let document = read_document(path).with_context(|| format!("Failed to load {}", path.display()))?;

    let storage = Storage::with_data_dir(config.data_dir.clone());
    storage.set_max_allocations(config.max_allocations);
    let stats = Stats::new();
    stats.add_allocations(&document.allocations);
    storage.add_allocations(document.allocations);

    tracing::debug!(path = ?path, records = storage.len(), "session loaded");
    Ok(Self {
      storage: Arc::new(storage),
      stats: Arc::new(stats),
    })
  }

  pub fn visualizer(&self) -> Visualizer {
    Visualizer::new(Arc::clone(&self.stats), Arc::clone(&self.storage))
  }
}
