//! Periodic progress reporting
//!
//! A background thread that logs the pipeline counters at a fixed interval
//! until it is stopped. Stopping is signalled over a channel so the reporter
//! wakes immediately instead of finishing its current sleep.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use log::info;

use crate::counters::{CounterSnapshot, PipelineCounters};
use crate::logging::format_count;
use crate::worker_pool::PoolMonitor;

/// Formats one progress line.
///
/// # Example
/// ```
/// use factpipe_lib::counters::CounterSnapshot;
/// use factpipe_lib::progress::format_progress;
///
/// let snapshot = CounterSnapshot { lines_read: 1200, submitted: 1100, completed: 1000, errors: 100 };
/// assert_eq!(
///     format_progress(&snapshot, 4, 1000),
///     "Progress | read 1,200 | submitted 1,100 | completed 1,000 | errors 100 | active 4 | pool-completed 1,000"
/// );
/// ```
#[must_use]
pub fn format_progress(snapshot: &CounterSnapshot, active: u64, pool_completed: u64) -> String {
    format!(
        "Progress | read {} | submitted {} | completed {} | errors {} | active {} | pool-completed {}",
        format_count(snapshot.lines_read),
        format_count(snapshot.submitted),
        format_count(snapshot.completed),
        format_count(snapshot.errors),
        format_count(active),
        format_count(pool_completed),
    )
}

/// Handle to a running progress reporter thread.
pub struct ProgressReporter {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<u64>>,
}

impl ProgressReporter {
    /// Starts logging every `interval`.
    ///
    /// # Errors
    /// Returns an error if the reporter thread cannot be spawned.
    pub fn start(
        interval: Duration,
        counters: Arc<PipelineCounters>,
        pool: PoolMonitor,
    ) -> io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::Builder::new().name("progress".to_string()).spawn(move || {
            let mut reports = 0;
            while let Err(RecvTimeoutError::Timeout) = stop_rx.recv_timeout(interval) {
                info!("{}", format_progress(&counters.snapshot(), pool.active(), pool.finished()));
                reports += 1;
            }
            reports
        })?;
        Ok(Self { stop: Some(stop_tx), handle: Some(handle) })
    }

    /// Stops the reporter and waits for it. Returns the number of progress
    /// lines it logged.
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        // Dropping the sender disconnects the channel, which also ends the wait.
        self.stop.take();
        self.handle.take().and_then(|h| h.join().ok()).unwrap_or(0)
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
