//! Fixed-size worker pool with a bounded submission queue.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  try_send   ┌──────────────────┐   recv   ┌─────────────┐  send   ┌─────────┐
//! │ Producer │────────────>│ bounded queue    │─────────>│ N workers   │────────>│ results │
//! │          │  (Rejected  │ (4 × N jobs)     │          │ limiter +   │         │ channel │
//! └──────────┘   if full)  └──────────────────┘          │ evaluate    │         └─────────┘
//!                                                        └─────────────┘
//! ```
//!
//! Submission never blocks: a full (or shut down) queue hands the job back as
//! [`Rejected`]. Each accepted job waits for a rate-limiter permit, evaluates
//! its input, posts a [`Message::Result`], then counts itself completed and
//! drops its [`AdmissionPermit`]. The last two steps run from a drop guard so
//! they happen on every exit path, panics included.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, error, warn};
use thiserror::Error;

use crate::admission::AdmissionPermit;
use crate::compute::Evaluate;
use crate::counters::PipelineCounters;
use crate::message::Message;
use crate::rate_limiter::RateLimiter;

/// Queue slots per worker thread.
pub const QUEUE_CAPACITY_PER_WORKER: usize = 4;

/// A unit of work bound to one valid record.
#[derive(Debug)]
pub struct Job {
    /// Line index of the record.
    pub index: u64,
    /// Parsed, non-negative input value.
    pub value: i64,
    /// Admission unit held until the job completes.
    pub permit: AdmissionPermit,
}

/// The pool refused a job. The job is handed back; dropping it releases its
/// admission permit.
#[derive(Debug, Error)]
#[error("job for line index {} rejected: worker queue is full or shut down", .0.index)]
pub struct Rejected(pub Job);

/// State shared between the pool handle, its submitters and its workers.
#[derive(Debug, Default)]
struct PoolShared {
    accepting: AtomicBool,
    active: AtomicU64,
    finished: AtomicU64,
}

/// Everything a worker needs to run a job.
struct WorkerContext {
    evaluator: Arc<dyn Evaluate>,
    limiter: Arc<RateLimiter>,
    results: Sender<Message>,
    counters: Arc<PipelineCounters>,
    shared: Arc<PoolShared>,
}

/// Cloneable handle used by producers to submit jobs.
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    jobs: Sender<Job>,
    shared: Arc<PoolShared>,
}

impl JobSubmitter {
    /// Enqueues `job` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] when the queue is full or the pool is shut down.
    pub fn submit(&self, job: Job) -> Result<(), Rejected> {
        if !self.shared.accepting.load(Ordering::Acquire) {
            return Err(Rejected(job));
        }
        self.jobs.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) | TrySendError::Disconnected(job) => Rejected(job),
        })
    }
}

/// Worker activity as seen from outside the pool.
#[derive(Debug, Clone)]
pub struct PoolMonitor {
    shared: Arc<PoolShared>,
}

impl PoolMonitor {
    #[must_use]
    pub fn active(&self) -> u64 {
        self.shared.active.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn finished(&self) -> u64 {
        self.shared.finished.load(Ordering::Relaxed)
    }
}

/// A pool of `N` fixed worker threads.
pub struct WorkerPool {
    submitter: Option<JobSubmitter>,
    workers: Vec<JoinHandle<()>>,
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Starts `threads` workers (at least one) behind a queue of
    /// `queue_capacity` jobs (at least one).
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn start(
        threads: usize,
        queue_capacity: usize,
        evaluator: Arc<dyn Evaluate>,
        limiter: Arc<RateLimiter>,
        results: Sender<Message>,
        counters: Arc<PipelineCounters>,
    ) -> std::io::Result<Self> {
        let (tx, rx) = bounded::<Job>(queue_capacity.max(1));
        let shared = Arc::new(PoolShared { accepting: AtomicBool::new(true), ..Default::default() });
        let ctx = Arc::new(WorkerContext {
            evaluator,
            limiter,
            results,
            counters,
            shared: Arc::clone(&shared),
        });

        let mut workers = Vec::with_capacity(threads.max(1));
        for id in 0..threads.max(1) {
            let rx = rx.clone();
            let ctx = Arc::clone(&ctx);
            let handle = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || worker_loop(&rx, &ctx))?;
            workers.push(handle);
        }
        debug!("Started {} workers with queue capacity {}", workers.len(), queue_capacity.max(1));

        Ok(Self {
            submitter: Some(JobSubmitter { jobs: tx, shared: Arc::clone(&shared) }),
            workers,
            shared,
        })
    }

    /// A handle for submitting jobs from another thread, `None` once the pool
    /// has been shut down.
    #[must_use]
    pub fn submitter(&self) -> Option<JobSubmitter> {
        self.submitter.clone()
    }

    /// Enqueues `job` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] when the queue is full or the pool is shut down.
    pub fn submit(&self, job: Job) -> Result<(), Rejected> {
        match &self.submitter {
            Some(submitter) => submitter.submit(job),
            None => Err(Rejected(job)),
        }
    }

    /// Read-only view of the activity counters for another thread.
    #[must_use]
    pub fn monitor(&self) -> PoolMonitor {
        PoolMonitor { shared: Arc::clone(&self.shared) }
    }

    /// Stops accepting jobs. Queued and running jobs are unaffected.
    pub fn close(&self) {
        self.shared.accepting.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::Acquire)
    }

    /// Stops accepting jobs, lets queued jobs finish and joins the workers.
    ///
    /// Workers exit once every outstanding [`JobSubmitter`] has been dropped.
    pub fn shutdown(&mut self) {
        self.close();
        self.submitter = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Worker thread panicked outside of a job");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Counts the job completed and releases its admission unit when dropped.
struct CompletionGuard<'a> {
    ctx: &'a WorkerContext,
    _permit: AdmissionPermit,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.ctx.counters.record_completed();
        self.ctx.shared.active.fetch_sub(1, Ordering::Relaxed);
        self.ctx.shared.finished.fetch_add(1, Ordering::Relaxed);
    }
}

fn worker_loop(jobs: &Receiver<Job>, ctx: &WorkerContext) {
    for job in jobs {
        run_job(ctx, job);
    }
}

fn run_job(ctx: &WorkerContext, job: Job) {
    let Job { index, value, permit } = job;
    ctx.shared.active.fetch_add(1, Ordering::Relaxed);
    let _guard = CompletionGuard { ctx, _permit: permit };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        ctx.limiter.acquire();
        ctx.evaluator.evaluate(value)
    }));

    let message = match outcome {
        Ok(Ok(computed)) => Message::Result { index, input: value, value: computed },
        Ok(Err(e)) => {
            error!("Contract violation at line index {index}: {e}");
            ctx.counters.record_error();
            Message::Skip { index }
        }
        Err(_) => {
            error!("Evaluation panicked at line index {index} (input {value})");
            ctx.counters.record_error();
            Message::Skip { index }
        }
    };

    if ctx.results.send(message).is_err() {
        warn!("Results channel closed; dropping result for line index {index}");
    }
}
