//! Common CLI options shared across commands.
//!
//! These are composed into command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use clap::Args;

use factpipe_lib::config::PipelineConfig;

/// Where settings come from, and overrides for individual keys.
///
/// Flags given on the command line take precedence over the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOptions {
    /// TOML config file. Defaults to ./factpipe.toml when it exists.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Input file, one integer per line
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for results in line order
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// File for diagnostics on malformed lines; the same path as --output
    /// merges the raw lines into the output instead
    #[arg(short = 'e', long = "errors")]
    pub errors: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short = 't', long = "pool-size")]
    pub pool_size: Option<usize>,

    /// Maximum computations per second across all workers
    #[arg(short = 'r', long = "rate", allow_negative_numbers = true)]
    pub rate_per_second: Option<i64>,

    /// Largest value kept in the precomputed table
    #[arg(long = "small-max")]
    pub small_max: Option<u32>,

    /// Keep following the input for this many milliseconds without growth
    /// (0 stops at end of file)
    #[arg(short = 'f', long = "follow-idle-ms")]
    pub follow_idle_ms: Option<u64>,

    /// Milliseconds between checks for new input while following
    #[arg(long = "poll-interval-ms")]
    pub poll_interval_ms: Option<u64>,

    /// Milliseconds between progress log lines (0 disables)
    #[arg(long = "progress-interval-ms")]
    pub progress_interval_ms: Option<u64>,
}

impl ConfigOptions {
    /// Loads the config file and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn resolve(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        Ok(config)
    }

    /// Overwrites every key given on the command line.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(input) = &self.input {
            config.input_path.clone_from(input);
        }
        if let Some(output) = &self.output {
            config.output_path.clone_from(output);
        }
        if let Some(errors) = &self.errors {
            config.errors_path.clone_from(errors);
        }
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }
        if let Some(rate) = self.rate_per_second {
            config.rate_per_second = rate;
        }
        if let Some(small_max) = self.small_max {
            config.small_max = small_max;
        }
        if let Some(follow_idle_ms) = self.follow_idle_ms {
            config.follow_idle_ms = follow_idle_ms;
        }
        if let Some(poll_interval_ms) = self.poll_interval_ms {
            config.poll_interval_ms = poll_interval_ms;
        }
        if let Some(progress_interval_ms) = self.progress_interval_ms {
            config.progress_interval_ms = progress_interval_ms;
        }
    }
}
