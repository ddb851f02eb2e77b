//! CLI command implementations for factpipe.
//!
//! - [`run`] - Run the pipeline over an input file
//! - [`factorial`] - Evaluate a single value

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod command;
pub mod common;
pub mod factorial;
pub mod run;
