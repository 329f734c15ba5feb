//! Background dashboard that redraws at a fixed interval.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::charts;
use crate::capture::untraced;
use crate::stats::Stats;

/// Clear screen and move the cursor home.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// A running dashboard thread. Dropping it stops the thread.
pub struct Monitor {
  running: Arc<AtomicBool>,
  handle: Option<JoinHandle<()>>,
}

impl Monitor {
  pub fn spawn(stats: Arc<Stats>, interval: Duration, mut sink: Box<dyn Write + Send>) -> Self {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);

    // The dashboard allocates while holding the stats lock.
    let handle = thread::spawn(move || {
      untraced(|| {
        while flag.load(Ordering::SeqCst) {
          let frame = write!(sink, "{CLEAR_SCREEN}")
            .and_then(|_| charts::dashboard(&mut sink, &stats))
            .and_then(|_| sink.flush());
          if let Err(e) = frame {
            warn!(error = %e, "monitor output failed, stopping");
            break;
          }

          let deadline = Instant::now() + interval;
          while flag.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
              break;
            }
            thread::park_timeout(deadline - now);
          }
        }
      })
    });

    info!(interval = ?interval, "realtime monitor started");
    Self {
      running,
      handle: Some(handle),
    }
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::SeqCst) && self.handle.as_ref().is_some_and(|h| !h.is_finished())
  }

  /// Signals the thread and waits for it to exit.
  pub fn stop(&mut self) {
    let Some(handle) = self.handle.take() else {
      return;
    };
    self.running.store(false, Ordering::SeqCst);
    handle.thread().unpark();
    if handle.join().is_err() {
      warn!("realtime monitor thread panicked");
    }
    info!("realtime monitor stopped");
  }
}

impl Drop for Monitor {
  fn drop(&mut self) {
    self.stop();
  }
}
