//! Evaluate a single value without running the pipeline.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use factpipe_lib::compute::{Evaluate, FactorialCache, FactorialService};
use factpipe_lib::config::MAX_SMALL_MAX;
use factpipe_lib::logging::OperationTimer;
use log::debug;

use crate::commands::command::Command;

/// Print `<n> = <n!>` for one value.
#[derive(Debug, Parser)]
#[command(name = "factorial", about = "Compute the factorial of a single value")]
pub struct Factorial {
    /// The value to evaluate
    #[arg(allow_negative_numbers = true)]
    pub value: i32,

    /// Largest value kept in the precomputed table
    #[arg(
        long = "small-max",
        default_value = "20",
        value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_SMALL_MAX))
    )]
    pub small_max: u32,
}

impl Command for Factorial {
    fn execute(&self, command_line: &str) -> Result<()> {
        debug!("Command line: {command_line}");
        let timer = OperationTimer::new("Computing factorial");
        let service = FactorialService::new(self.small_max, Arc::new(FactorialCache::new()));
        let value = service
            .evaluate(i64::from(self.value))
            .with_context(|| format!("cannot compute the factorial of {}", self.value))?;
        timer.log_completion(1);
        println!("{} = {value}", self.value);
        Ok(())
    }
}
