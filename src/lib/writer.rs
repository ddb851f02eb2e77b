//! The consumer: reassembles results in line order and writes them out.
//!
//! Messages arrive in any order from the producer and the workers. Each one is
//! merged into a [`ReorderBuffer`] at its line index (keeping the higher
//! precedence message when two target the same index) and the contiguous
//! prefix is written immediately, one flushed line per rendered message.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crossbeam_channel::Receiver;
use log::{debug, warn};

use crate::errors::{FactpipeError, Result};
use crate::message::Message;
use crate::reorder_buffer::{MergeOutcome, ReorderBuffer};

/// Creates (or truncates) the output file, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file or its parent directory cannot be created.
pub fn create_output(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FactpipeError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| FactpipeError::io(path, e))?;
    Ok(BufWriter::new(file))
}

/// What the consumer did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Output lines written.
    pub lines_written: u64,
    /// Indices consumed, with or without an output line.
    pub indices_consumed: u64,
    /// Messages dropped because their index had already been written.
    pub stale_messages: u64,
}

/// Single consumer of the results channel.
pub struct ResultWriter<W: Write> {
    out: W,
    pending: ReorderBuffer<Message>,
    stats: WriterStats,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, pending: ReorderBuffer::new(), stats: WriterStats::default() }
    }

    /// Consumes messages until [`Message::Poison`] arrives or every sender has
    /// been dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn run(mut self, results: &Receiver<Message>) -> io::Result<WriterStats> {
        for message in results {
            if message.is_poison() {
                break;
            }
            self.accept(message)?;
        }

        if !self.pending.is_empty() {
            warn!(
                "{} buffered result(s) never became contiguous; next expected line index {}",
                self.pending.len(),
                self.pending.next_seq()
            );
        }
        self.out.flush()?;
        debug!(
            "Writer finished: {} lines written for {} indices",
            self.stats.lines_written, self.stats.indices_consumed
        );
        Ok(self.stats)
    }

    /// Merges one message and writes whatever became contiguous.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn accept(&mut self, message: Message) -> io::Result<()> {
        let Some(index) = message.index() else {
            return Ok(());
        };
        if self.pending.merge(index, message) == MergeOutcome::Stale {
            debug!("Dropping message for already written line index {index}");
            self.stats.stale_messages += 1;
            return Ok(());
        }

        for ready in self.pending.drain_ready() {
            self.stats.indices_consumed += 1;
            if let Some(line) = ready.render() {
                writeln!(self.out, "{line}")?;
                self.out.flush()?;
                self.stats.lines_written += 1;
            }
        }
        Ok(())
    }

    /// Next line index the writer is waiting for.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.pending.next_seq()
    }

    #[must_use]
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
