//! Pipeline configuration.
//!
//! Settings come from an optional TOML file in which every key is optional,
//! then command-line overrides, then [`PipelineConfig::validate`]:
//!
//! ```toml
//! input_path = "input.txt"
//! output_path = "output.txt"
//! errors_path = "errors.txt"
//! pool_size = 4
//! rate_per_second = 100
//! small_max = 20
//! follow_idle_ms = 2000
//! poll_interval_ms = 200
//! progress_interval_ms = 1000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{FactpipeError, Result};
use crate::validation::{clamp_at_least, validate_positive, within_or_default};
use crate::worker_pool::QUEUE_CAPACITY_PER_WORKER;

/// Config file picked up from the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "factpipe.toml";

/// Largest accepted `rate_per_second`.
pub const MAX_RATE_PER_SECOND: i64 = 100_000;

/// Largest accepted `small_max`.
pub const MAX_SMALL_MAX: u32 = 100_000;

/// Accepted range for a non-zero `progress_interval_ms`.
pub const PROGRESS_INTERVAL_RANGE_MS: std::ops::RangeInclusive<u64> = 50..=60_000;

/// Everything a pipeline run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Line-delimited input, tailed while it grows.
    pub input_path: PathBuf,
    /// Ordered results. Truncated at start.
    pub output_path: PathBuf,
    /// Diagnostics for malformed lines. When this names the same file as
    /// `output_path` the raw lines are merged into the output instead.
    pub errors_path: PathBuf,
    /// Worker threads, and units of the admission semaphore. At least 1.
    pub pool_size: usize,
    /// Global throughput cap. Clamped to at least 1; above
    /// [`MAX_RATE_PER_SECOND`] the default is used.
    pub rate_per_second: i64,
    /// Largest argument kept in the precomputed table, at most
    /// [`MAX_SMALL_MAX`].
    pub small_max: u32,
    /// Stop following the input after this long without growth. 0 stops at
    /// the first read that finds nothing new.
    pub follow_idle_ms: u64,
    /// Sleep between length checks while following. At least 1.
    pub poll_interval_ms: u64,
    /// Progress log interval. 0 disables the reporter; other values outside
    /// [`PROGRESS_INTERVAL_RANGE_MS`] fall back to the default.
    pub progress_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("input.txt"),
            output_path: PathBuf::from("output.txt"),
            errors_path: PathBuf::from("errors.txt"),
            pool_size: 4,
            rate_per_second: 100,
            small_max: 20,
            follow_idle_ms: 2000,
            poll_interval_ms: 200,
            progress_interval_ms: 1000,
        }
    }
}

impl PipelineConfig {
    /// Loads a TOML config file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| FactpipeError::io(path, e))?;
        Self::from_toml(&contents, path)
    }

    /// Parses TOML text; `origin` is only used in error messages.
    ///
    /// # Errors
    /// Returns an error if the text is not a valid config.
    ///
    /// # Example
    /// ```
    /// use std::path::Path;
    /// use factpipe_lib::config::PipelineConfig;
    ///
    /// let config = PipelineConfig::from_toml("pool_size = 8", Path::new("inline")).unwrap();
    /// assert_eq!(config.pool_size, 8);
    /// assert_eq!(config.rate_per_second, 100);
    /// ```
    pub fn from_toml(contents: &str, origin: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|e| FactpipeError::InvalidConfig {
            path: origin.display().to_string(),
            reason: e.message().to_string(),
        })
    }

    /// Loads `path` if given, else [`DEFAULT_CONFIG_FILE`] when it exists,
    /// else the defaults.
    ///
    /// # Errors
    /// Returns an error if the chosen file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() { Self::from_file(fallback) } else { Ok(Self::default()) }
            }
        }
    }

    /// Checks hard limits and clamps soft ones.
    ///
    /// # Errors
    /// Returns an error if `pool_size` is zero.
    pub fn validate(&mut self) -> Result<()> {
        let defaults = Self::default();
        validate_positive(self.pool_size, "pool-size")?;
        self.rate_per_second = within_or_default(
            clamp_at_least(self.rate_per_second, 1, "rate-per-second"),
            1..=MAX_RATE_PER_SECOND,
            defaults.rate_per_second,
            "rate-per-second",
        );
        self.small_max =
            within_or_default(self.small_max, 0..=MAX_SMALL_MAX, defaults.small_max, "small-max");
        self.poll_interval_ms = clamp_at_least(self.poll_interval_ms, 1, "poll-interval-ms");
        if self.progress_interval_ms > 0 {
            self.progress_interval_ms = within_or_default(
                self.progress_interval_ms,
                PROGRESS_INTERVAL_RANGE_MS,
                defaults.progress_interval_ms,
                "progress-interval-ms",
            );
        }
        Ok(())
    }

    /// Permits per second for the rate limiter, clamped to `1..=u32::MAX`.
    #[must_use]
    pub fn rate_limit(&self) -> u32 {
        u32::try_from(self.rate_per_second.max(1)).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn follow_idle(&self) -> Duration {
        Duration::from_millis(self.follow_idle_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// `None` when progress reporting is disabled.
    #[must_use]
    pub fn progress_interval(&self) -> Option<Duration> {
        (self.progress_interval_ms > 0).then(|| Duration::from_millis(self.progress_interval_ms))
    }

    /// Capacity of the worker submission queue.
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.pool_size.max(1).saturating_mul(QUEUE_CAPACITY_PER_WORKER)
    }
}
