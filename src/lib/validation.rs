//! Input validation utilities
//!
//! Common checks for command-line parameters and file paths, reported through
//! the structured errors in [`crate::errors`].

use crate::error_sink::same_destination;
use crate::errors::{FactpipeError, Result};
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::Path;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use factpipe_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/input.txt", "Input");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.is_file() {
        return Err(FactpipeError::InvalidFile {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that the output would not overwrite the input
///
/// # Errors
/// Returns an error if both paths name the same file
pub fn validate_distinct_from_input(input: &Path, other: &Path, name: &str) -> Result<()> {
    if same_destination(input, other) {
        return Err(FactpipeError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("'{}' is the input file", other.display()),
        });
    }
    Ok(())
}

/// Validate that a value is positive (> 0)
///
/// # Errors
/// Returns an error if the value is not positive
///
/// # Example
/// ```
/// use factpipe_lib::validation::validate_positive;
///
/// validate_positive(4, "pool-size").unwrap();
///
/// let result = validate_positive(0, "pool-size");
/// assert!(result.is_err());
/// ```
#[allow(clippy::needless_pass_by_value)]
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(FactpipeError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be positive (> 0), got: {value}"),
        });
    }
    Ok(())
}

/// Clamp a value to a lower bound, warning when it had to be raised
///
/// # Example
/// ```
/// use factpipe_lib::validation::clamp_at_least;
///
/// assert_eq!(clamp_at_least(0, 1, "rate"), 1);
/// assert_eq!(clamp_at_least(50, 1, "rate"), 50);
/// ```
#[must_use]
pub fn clamp_at_least<T: Ord + Display + Copy>(value: T, min: T, name: &str) -> T {
    if value < min {
        log::warn!("{name} of {value} is below the minimum; using {min}");
        min
    } else {
        value
    }
}

/// Keep a value inside `range`, falling back to `default` when it is outside
///
/// # Example
/// ```
/// use factpipe_lib::validation::within_or_default;
///
/// assert_eq!(within_or_default(500, 0..=1000, 20, "small-max"), 500);
/// assert_eq!(within_or_default(5000, 0..=1000, 20, "small-max"), 20);
/// ```
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn within_or_default<T: Ord + Display + Copy>(
    value: T,
    range: RangeInclusive<T>,
    default: T,
    name: &str,
) -> T {
    if range.contains(&value) {
        value
    } else {
        log::warn!(
            "{name} of {value} is outside {}..={}; using the default {default}",
            range.start(),
            range.end()
        );
        default
    }
}
