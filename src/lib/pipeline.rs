//! The orchestrator: wires the components together and runs the shutdown
//! protocol.
//!
//! # Threads
//!
//! ```text
//!                 Skip / RawError
//!          ┌────────────────────────────────────────────┐
//!          │                                            ▼
//! ┌────────┴─┐ admission  ┌─────────────┐  Result  ┌─────────┐   ┌────────┐
//! │ reader   │──────────> │ worker-0..N │ ───────> │ results │──>│ writer │──> output
//! └──────────┘  + submit  └─────────────┘          └─────────┘   └────────┘
//!      │                         ▲
//!      └──> errors file          └── rate limiter, factorial cache
//! ```
//!
//! # Shutdown
//!
//! 1. The reader finishes (input exhausted or a fatal I/O error).
//! 2. Wait until `completed == submitted`. Every result is posted before its
//!    job counts as completed, so all results are now in the channel.
//! 3. Close and join the pool, then shut the rate limiter down.
//! 4. Post [`Message::Poison`]; it lands behind every other message.
//! 5. Join the writer, then stop the progress reporter.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use log::{debug, error, info};

use crate::admission::FairSemaphore;
use crate::compute::{Evaluate, FactorialCache, FactorialService};
use crate::config::PipelineConfig;
use crate::counters::{CounterSnapshot, PipelineCounters};
use crate::error_sink::{ErrorMode, ErrorSink, same_destination};
use crate::errors::{FactpipeError, Result};
use crate::logging::format_elapsed;
use crate::message::Message;
use crate::progress::ProgressReporter;
use crate::rate_limiter::RateLimiter;
use crate::reader::{LineReader, TailSettings};
use crate::validation::validate_distinct_from_input;
use crate::worker_pool::WorkerPool;
use crate::writer::{ResultWriter, create_output};

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Final counter values.
    pub counters: CounterSnapshot,
    /// Worker threads used.
    pub pool_size: usize,
    /// Rate limit in permits per second.
    pub rate_per_second: u32,
    /// Where diagnostics went.
    pub mode: ErrorMode,
    /// Lines written to the output.
    pub lines_written: u64,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
    /// Fatal error that stopped the reader, if any.
    pub reader_error: Option<String>,
    /// Fatal error that stopped the writer, if any.
    pub writer_error: Option<String>,
}

impl RunSummary {
    /// Whether both the reader and the writer ran to completion.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.reader_error.is_none() && self.writer_error.is_none()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress | read {} | submitted {} | completed {} | errors {} | pool {} | rate {}/s | mode={} | elapsed {} ({} ms)",
            self.counters.lines_read,
            self.counters.submitted,
            self.counters.completed,
            self.counters.errors,
            self.pool_size,
            self.rate_per_second,
            self.mode,
            format_elapsed(self.elapsed),
            self.elapsed.as_millis(),
        )
    }
}

/// A configured pipeline, runnable once or many times.
pub struct Pipeline {
    config: PipelineConfig,
    evaluator: Option<Arc<dyn Evaluate>>,
}

impl Pipeline {
    /// A pipeline computing factorials. Each run gets a fresh memo cache.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, evaluator: None }
    }

    /// A pipeline that evaluates lines with `evaluator` instead.
    #[must_use]
    pub fn with_evaluator(config: PipelineConfig, evaluator: Arc<dyn Evaluate>) -> Self {
        Self { config, evaluator: Some(evaluator) }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline to completion.
    ///
    /// Fatal I/O errors hit by the reader or writer once the run has started
    /// are reported in the [`RunSummary`] rather than returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the output or errors
    /// file cannot be created, or a thread cannot be spawned.
    pub fn run(&self) -> Result<RunSummary> {
        let mut config = self.config.clone();
        config.validate()?;
        validate_distinct_from_input(&config.input_path, &config.output_path, "output")?;
        validate_distinct_from_input(&config.input_path, &config.errors_path, "errors")?;

        let start = Instant::now();
        let (results_tx, results_rx) = unbounded::<Message>();

        let out = create_output(&config.output_path)?;
        let errors = if same_destination(&config.errors_path, &config.output_path) {
            ErrorSink::inline(results_tx.clone())
        } else {
            ErrorSink::to_file(&config.errors_path)?
        };
        let mode = errors.mode();

        info!(
            "Starting pipeline: pool {} | rate {}/s | mode={mode} | follow {} ms",
            config.pool_size,
            config.rate_limit(),
            config.follow_idle_ms
        );

        let evaluator: Arc<dyn Evaluate> = match &self.evaluator {
            Some(evaluator) => Arc::clone(evaluator),
            None => Arc::new(FactorialService::new(config.small_max, Arc::new(FactorialCache::new()))),
        };
        let counters = Arc::new(PipelineCounters::new());
        let limiter = Arc::new(RateLimiter::new(config.rate_limit()));
        let slots = Arc::new(FairSemaphore::new(config.pool_size));

        let writer = spawn_named("writer", move || {
            let outcome = ResultWriter::new(out).run(&results_rx);
            if let Err(e) = &outcome {
                error!("Writer stopped: {e}");
            }
            outcome
        })?;

        let mut pool = WorkerPool::start(
            config.pool_size,
            config.queue_capacity(),
            evaluator,
            Arc::clone(&limiter),
            results_tx.clone(),
            Arc::clone(&counters),
        )
        .map_err(|e| FactpipeError::io("worker threads", e))?;

        let progress = match config.progress_interval() {
            Some(interval) => Some(
                ProgressReporter::start(interval, Arc::clone(&counters), pool.monitor())
                    .map_err(|e| FactpipeError::io("progress thread", e))?,
            ),
            None => None,
        };

        let submitter = pool.submitter().ok_or_else(|| FactpipeError::InvalidParameter {
            parameter: "pool".to_string(),
            reason: "worker pool is not accepting jobs".to_string(),
        })?;
        let reader = LineReader::new(
            &config.input_path,
            results_tx.clone(),
            errors,
            submitter,
            slots,
            Arc::clone(&counters),
            TailSettings { follow_idle: config.follow_idle(), poll_interval: config.poll_interval() },
        );
        let reader = spawn_named("reader", move || reader.run())?;

        let reader_error = match reader.join() {
            Ok(Ok(lines)) => {
                debug!("Reader dispatched {lines} lines");
                None
            }
            Ok(Err(e)) => {
                error!("Reader stopped on {}: {e}", config.input_path.display());
                Some(format!("{}: {e}", config.input_path.display()))
            }
            Err(_) => {
                error!("Reader thread panicked");
                Some("reader thread panicked".to_string())
            }
        };

        counters.wait_for_drain();
        pool.shutdown();
        limiter.shutdown();
        debug!("Drained {} jobs; posting end of stream", counters.completed());

        if results_tx.send(Message::Poison).is_err() {
            debug!("Writer already gone; end of stream not posted");
        }
        drop(results_tx);

        let (lines_written, writer_error) = match writer.join() {
            Ok(Ok(stats)) => (stats.lines_written, None),
            Ok(Err(e)) => (0, Some(format!("{}: {e}", config.output_path.display()))),
            Err(_) => {
                error!("Writer thread panicked");
                (0, Some("writer thread panicked".to_string()))
            }
        };

        if let Some(progress) = progress {
            progress.stop();
        }

        let summary = RunSummary {
            counters: counters.snapshot(),
            pool_size: config.pool_size,
            rate_per_second: config.rate_limit(),
            mode,
            lines_written,
            elapsed: start.elapsed(),
            reader_error,
            writer_error,
        };
        info!("{summary}");
        Ok(summary)
    }
}

fn spawn_named<T, F>(name: &str, f: F) -> Result<thread::JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|e: io::Error| FactpipeError::io(format!("{name} thread"), e))
}
