//! Custom error types for factpipe operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for factpipe operations
pub type Result<T> = std::result::Result<T, FactpipeError>;

/// Error type for factpipe operations
#[derive(Error, Debug)]
pub enum FactpipeError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Configuration file could not be parsed
    #[error("Invalid config file '{path}': {reason}")]
    InvalidConfig {
        /// Path to the config file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A required file is missing or unusable
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFile {
        /// Role of the file (e.g., "Input", "Config")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// I/O failure on a named path
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// The path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl FactpipeError {
    /// Wraps an I/O error with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Error raised by an [`Evaluate`](crate::compute::Evaluate) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComputeError {
    /// Negative arguments are outside the domain of the function
    #[error("Invalid input {0}: negative numbers are not supported")]
    InvalidInput(i64),
}
