//! Text charts over collected statistics.
//!
//! [`Visualizer`] draws charts into any [`Write`] sink, renders them to
//! strings for export, and drives the realtime [`Monitor`].

mod charts;
mod monitor;

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

pub use charts::bar;
pub use monitor::Monitor;

use crate::stats::Stats;
use crate::storage::{Storage, StorageError};

#[derive(Debug, Error)]
pub enum VisualizationError {
  #[error("failed to write chart: {0}")]
  Io(#[from] io::Error),

  #[error(transparent)]
  Storage(#[from] StorageError),
}

/// The charts the visualizer can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
  Function,
  SizeHistogram,
  Timeline,
  Hotspots,
  CallStacks,
  Files,
}

/// Chart front end over shared stats and storage.
pub struct Visualizer {
  stats: Arc<Stats>,
  storage: Arc<Storage>,
  monitor: Mutex<Option<Monitor>>,
}

impl Visualizer {
  pub fn new(stats: Arc<Stats>, storage: Arc<Storage>) -> Self {
    Self {
      stats,
      storage,
      monitor: Mutex::new(None),
    }
  }

  pub fn initialize(&self) {
    info!("visualization initialized");
  }

  pub fn shutdown(&self) {
    self.stop_monitor();
    info!("visualization shutdown");
  }

  pub fn draw_function_chart(&self, out: &mut dyn Write, limit: usize) -> io::Result<()> {
    charts::function_chart(out, &self.stats, limit)
  }

  pub fn draw_size_histogram(&self, out: &mut dyn Write) -> io::Result<()> {
    charts::size_histogram(out, &self.stats)
  }

  pub fn draw_timeline(&self, out: &mut dyn Write, bucket_ns: u64) -> Result<(), VisualizationError> {
    let points = self.storage.timeline(bucket_ns)?;
    charts::timeline(out, &points)?;
    Ok(())
  }

  pub fn draw_hotspots(&self, out: &mut dyn Write, limit: usize) -> io::Result<()> {
    charts::hotspots(out, &self.stats, limit)
  }

  pub fn draw_call_stacks(&self, out: &mut dyn Write, limit: usize) -> io::Result<()> {
    charts::call_stacks(out, &self.stats, limit)
  }

  pub fn draw_file_chart(&self, out: &mut dyn Write, limit: usize) -> io::Result<()> {
    charts::file_chart(out, &self.stats, limit)
  }

  /// Draws any chart. `limit` is ignored by charts without rows to cap and
  /// `bucket_ns` is only used by the timeline.
  pub fn draw(&self, out: &mut dyn Write, kind: ChartKind, limit: usize, bucket_ns: u64) -> Result<(), VisualizationError> {
    match kind {
      ChartKind::Function => self.draw_function_chart(out, limit)?,
      ChartKind::SizeHistogram => self.draw_size_histogram(out)?,
      ChartKind::Timeline => self.draw_timeline(out, bucket_ns)?,
      ChartKind::Hotspots => self.draw_hotspots(out, limit)?,
      ChartKind::CallStacks => self.draw_call_stacks(out, limit)?,
      ChartKind::Files => self.draw_file_chart(out, limit)?,
    }
    Ok(())
  }

  pub fn export_to_text(&self, kind: ChartKind, limit: usize, bucket_ns: u64) -> Result<String, VisualizationError> {
    let mut buf = Vec::new();
    self.draw(&mut buf, kind, limit, bucket_ns)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
  }

  pub fn export_function_chart_to_text(&self, limit: usize) -> Result<String, VisualizationError> {
    self.export_to_text(ChartKind::Function, limit, 0)
  }

  pub fn export_size_distribution_to_text(&self) -> Result<String, VisualizationError> {
    self.export_to_text(ChartKind::SizeHistogram, 0, 0)
  }

  pub fn export_timeline_to_text(&self, bucket_ns: u64) -> Result<String, VisualizationError> {
    self.export_to_text(ChartKind::Timeline, 0, bucket_ns)
  }

  pub fn export_report_to_text(&self) -> String {
    self.stats.generate_report()
  }

  /// Starts the realtime dashboard. Returns `false` if one is already running.
  pub fn start_monitor(&self, interval: Duration, sink: Box<dyn Write + Send>) -> bool {
    let mut slot = self.monitor.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.as_ref().is_some_and(Monitor::is_running) {
      return false;
    }
    *slot = Some(Monitor::spawn(Arc::clone(&self.stats), interval, sink));
    true
  }

  pub fn stop_monitor(&self) {
    let monitor = self.monitor.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(mut monitor) = monitor {
      monitor.stop();
    }
  }

  pub fn is_monitoring(&self) -> bool {
    self
      .monitor
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .as_ref()
      .is_some_and(Monitor::is_running)
  }
}
