//! Process-wide pipeline counters.
//!
//! The counters are for observability: the producer and workers bump them,
//! the orchestrator and the progress reporter read them. The only decision
//! taken from them is the drain check `completed == submitted` at shutdown,
//! which [`PipelineCounters::wait_for_drain`] waits on with a condition
//! variable signalled by every completion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Upper bound on a single drain wait before re-checking the counters.
const DRAIN_RECHECK: Duration = Duration::from_millis(10);

/// Monotonically non-decreasing run counters.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    lines_read: AtomicU64,
    submitted: AtomicU64,
    completed: AtomicU64,
    errors: AtomicU64,
    drain_lock: Mutex<()>,
    drained: Condvar,
}

/// A point-in-time copy of [`PipelineCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub lines_read: u64,
    pub submitted: u64,
    pub completed: u64,
    pub errors: u64,
}

impl PipelineCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line_read(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a finished job and wakes anyone waiting for the drain.
    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
        let _guard = self.drain_lock.lock();
        self.drained.notify_all();
    }

    #[must_use]
    pub fn lines_read(&self) -> u64 {
        self.lines_read.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            lines_read: self.lines_read(),
            submitted: self.submitted(),
            completed: self.completed(),
            errors: self.errors(),
        }
    }

    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.completed() >= self.submitted()
    }

    /// Blocks until every submitted job has completed.
    ///
    /// Only meaningful once the producer has stopped submitting.
    pub fn wait_for_drain(&self) {
        let mut guard = self.drain_lock.lock();
        while !self.is_drained() {
            let _ = self.drained.wait_for(&mut guard, DRAIN_RECHECK);
        }
    }
}
