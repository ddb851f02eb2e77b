//! Destination for per-line diagnostics.
//!
//! Malformed lines are reported either to a dedicated errors file (each line
//! `Line <n>: [<original>] -> <reason>` with `n` one-based, mirrored to the log
//! at warn level) or, when the errors path and the output path resolve to the
//! same file, merged into the output as [`Message::RawError`] at the line's
//! original index.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use log::warn;

use crate::errors::{FactpipeError, Result};
use crate::message::Message;

/// How diagnostics reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMode {
    /// Raw malformed lines are written into the output at their index.
    InlineToOutput,
    /// Diagnostics go to a separate errors file.
    SeparateFile,
}

impl std::fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InlineToOutput => f.write_str("INLINE_TO_OUTPUT"),
            Self::SeparateFile => f.write_str("SEPARATE_FILE"),
        }
    }
}

/// Formats the diagnostic for the zero-based line `index`.
///
/// # Example
///
/// ```
/// use factpipe_lib::error_sink::format_diagnostic;
///
/// assert_eq!(format_diagnostic(2, "x", "not a valid integer"), "Line 3: [x] -> not a valid integer");
/// ```
#[must_use]
pub fn format_diagnostic(index: u64, original: &str, reason: &str) -> String {
    format!("Line {}: [{original}] -> {reason}", index + 1)
}

/// Whether two paths name the same file.
///
/// Paths that both exist are compared after canonicalisation; otherwise their
/// normalised absolute forms are compared.
#[must_use]
pub fn same_destination(a: &Path, b: &Path) -> bool {
    if let (Ok(a), Ok(b)) = (fs::canonicalize(a), fs::canonicalize(b)) {
        return a == b;
    }
    match (normalize(a), normalize(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Absolute path with `.` and `..` components folded, and the parent directory
/// canonicalised when it exists.
fn normalize(path: &Path) -> Option<PathBuf> {
    let absolute = std::path::absolute(path).ok()?;
    let mut folded = PathBuf::new();
    for component in absolute.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                folded.pop();
            }
            other => folded.push(other),
        }
    }
    if let (Some(parent), Some(name)) = (folded.parent(), folded.file_name()) {
        if let Ok(parent) = fs::canonicalize(parent) {
            return Some(parent.join(name));
        }
    }
    Some(folded)
}

/// Receives diagnostics for malformed lines.
#[derive(Debug)]
pub enum ErrorSink {
    /// Writes formatted diagnostics to a file, truncated at creation.
    File {
        /// Path of the errors file.
        path: PathBuf,
        /// Buffered writer over the file.
        writer: BufWriter<File>,
    },
    /// Posts the raw line to the results channel.
    Inline {
        /// The results channel.
        results: Sender<Message>,
    },
}

impl ErrorSink {
    /// Creates (or truncates) the errors file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directory cannot be created.
    pub fn to_file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| FactpipeError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| FactpipeError::io(path, e))?;
        Ok(Self::File { path: path.to_path_buf(), writer: BufWriter::new(file) })
    }

    /// Merges diagnostics into the output stream.
    #[must_use]
    pub fn inline(results: Sender<Message>) -> Self {
        Self::Inline { results }
    }

    #[must_use]
    pub fn mode(&self) -> ErrorMode {
        match self {
            Self::File { .. } => ErrorMode::SeparateFile,
            Self::Inline { .. } => ErrorMode::InlineToOutput,
        }
    }

    /// Reports a malformed line at zero-based `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the errors file cannot be written.
    pub fn report(&mut self, index: u64, original: &str, reason: &str) -> io::Result<()> {
        match self {
            Self::File { writer, .. } => {
                let diagnostic = format_diagnostic(index, original, reason);
                warn!("{diagnostic}");
                writeln!(writer, "{diagnostic}")?;
                writer.flush()
            }
            Self::Inline { results } => {
                warn!("{}", format_diagnostic(index, original, reason));
                results
                    .send(Message::RawError { index, text: original.to_string() })
                    .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "results channel closed"))
            }
        }
    }

    /// Flushes buffered diagnostics.
    ///
    /// # Errors
    ///
    /// Returns an error if the errors file cannot be flushed.
    pub fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::File { writer, .. } => writer.flush(),
            Self::Inline { .. } => Ok(()),
        }
    }
}
