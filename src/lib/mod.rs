#![deny(unsafe_code)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args
)]

//! # factpipe - concurrent, order-preserving line processing
//!
//! This library reads integers from a line-delimited file (optionally following
//! it as it grows), computes their factorials on a bounded worker pool under a
//! global rate limit, and writes the results back in original line order.
//!
//! ## Overview
//!
//! ### Pipeline
//!
//! - **[`pipeline`]** - Orchestrator and run summary
//! - **[`reader`]** - Tailing producer and line classification
//! - **[`worker_pool`]** - Fixed worker threads behind a bounded, rejecting queue
//! - **[`writer`]** - Consumer that restores line order
//!
//! ### Building blocks
//!
//! - **[`admission`]** - Fair counting semaphore giving end-to-end backpressure
//! - **[`rate_limiter`]** - Lock-free global rate limiter
//! - **[`compute`]** - Memoised arbitrary-precision factorials
//! - **[`reorder_buffer`]** - Index-keyed reassembly with precedence merge
//! - **[`message`]** - Messages carried on the results channel
//! - **[`error_sink`]** - Separate or merged diagnostics for malformed lines
//! - **[`counters`]** - Shared run counters and the drain signal
//!
//! ### Utilities
//!
//! - **[`config`]** - TOML configuration with defaults and validation
//! - **[`validation`]** - Parameter and path checks
//! - **[`progress`]** - Periodic progress reporting
//! - **[`logging`]** - Formatting for counts, durations and rates
//! - **[`errors`]** - Error types
//!
//! ## Quick Start
//!
//! ```no_run
//! use factpipe_lib::config::PipelineConfig;
//! use factpipe_lib::pipeline::Pipeline;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = PipelineConfig { pool_size: 8, follow_idle_ms: 0, ..Default::default() };
//! let summary = Pipeline::new(config).run()?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod admission;
pub mod compute;
pub mod config;
pub mod counters;
pub mod error_sink;
pub mod errors;
pub mod logging;
pub mod message;
pub mod pipeline;
pub mod progress;
pub mod rate_limiter;
pub mod reader;
pub mod reorder_buffer;
pub mod validation;
pub mod worker_pool;
pub mod writer;
