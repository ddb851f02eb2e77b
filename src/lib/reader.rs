//! The producer: tails the input file, classifies lines and dispatches them.
//!
//! # Tailing
//!
//! The reader is a small state machine driven by a poll loop:
//!
//! ```text
//!            lines read                 no complete line
//!   ┌──────────────────────┐   ┌───────────────────────────────┐
//!   ▼                      │   │                               ▼
//! Reading ─────────────────┴───┘                             Idle ──(idle ≥ follow)──> Exhausted
//!   ▲   ▲                                                   │  │
//!   │   └────────────── Grown <──(len > known length)───────┘  │
//!   └────────────────── Truncated <──(len < position)──────────┘
//! ```
//!
//! A trailing line without a terminator is held back while the file may still
//! grow and is dispatched when the reader reaches `Exhausted`. A shrinking file
//! is treated as a fresh source: reading restarts at offset 0 while line
//! indices keep counting up, so no index is ever reused.
//!
//! # Dispatch
//!
//! Each line gets the next zero-based index. Malformed lines go to the
//! [`ErrorSink`] and leave a [`Message::Skip`] placeholder. Valid lines take
//! one unit of the fair admission semaphore (blocking while the pool is busy)
//! and are submitted to the pool; a rejected submission releases the unit and
//! leaves a `Skip` as well.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, info, warn};

use crate::admission::FairSemaphore;
use crate::counters::PipelineCounters;
use crate::error_sink::ErrorSink;
use crate::message::Message;
use crate::worker_pool::{Job, JobSubmitter, Rejected};

/// Why a line cannot be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    Empty,
    NotAnInteger,
    Negative,
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty/whitespace line",
            Self::NotAnInteger => "not a valid integer",
            Self::Negative => "negative number not allowed",
        })
    }
}

/// Classifies one line of input.
///
/// Values must fit a signed 32-bit integer; anything wider is "not a valid
/// integer".
///
/// # Errors
///
/// Returns the [`InvalidReason`] for empty, non-integer or negative lines.
///
/// # Example
///
/// ```
/// use factpipe_lib::reader::{InvalidReason, classify};
///
/// assert_eq!(classify(" 42 "), Ok(42));
/// assert_eq!(classify("\t"), Err(InvalidReason::Empty));
/// assert_eq!(classify("4x"), Err(InvalidReason::NotAnInteger));
/// assert_eq!(classify("-1"), Err(InvalidReason::Negative));
/// ```
pub fn classify(text: &str) -> Result<i64, InvalidReason> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InvalidReason::Empty);
    }
    let value: i32 = trimmed.parse().map_err(|_| InvalidReason::NotAnInteger)?;
    if value < 0 {
        return Err(InvalidReason::Negative);
    }
    Ok(i64::from(value))
}

/// Follow-mode timing.
#[derive(Debug, Clone, Copy)]
pub struct TailSettings {
    /// Stop once no growth has been seen for this long. Zero stops at the first
    /// read that finds no new data.
    pub follow_idle: Duration,
    /// Sleep between two length checks while idle.
    pub poll_interval: Duration,
}

impl Default for TailSettings {
    fn default() -> Self {
        Self { follow_idle: Duration::from_millis(2000), poll_interval: Duration::from_millis(200) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TailState {
    Reading,
    Idle,
    Grown,
    Truncated,
    Exhausted,
}

/// Read position within the input file.
#[derive(Debug, Default)]
struct TailCursor {
    /// Offset just past the last complete line.
    position: u64,
    /// Bytes of an unterminated trailing line seen beyond `position`.
    pending: u64,
}

impl TailCursor {
    fn known_len(&self) -> u64 {
        self.position + self.pending
    }

    /// Compares a fresh length check against what has been read so far.
    /// A file that shrank but still covers `position` only loses pending bytes.
    fn observe(&mut self, len: u64) -> TailState {
        if len < self.position {
            TailState::Truncated
        } else if len > self.known_len() {
            TailState::Grown
        } else {
            self.pending = len - self.position;
            TailState::Idle
        }
    }
}

/// The single producer of a pipeline run.
pub struct LineReader {
    path: PathBuf,
    results: Sender<Message>,
    errors: ErrorSink,
    submitter: JobSubmitter,
    slots: Arc<FairSemaphore>,
    counters: Arc<PipelineCounters>,
    settings: TailSettings,
    next_index: u64,
}

impl LineReader {
    #[must_use]
    pub fn new(
        path: &Path,
        results: Sender<Message>,
        errors: ErrorSink,
        submitter: JobSubmitter,
        slots: Arc<FairSemaphore>,
        counters: Arc<PipelineCounters>,
        settings: TailSettings,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            results,
            errors,
            submitter,
            slots,
            counters,
            settings,
            next_index: 0,
        }
    }

    /// Tails the input until it is exhausted.
    ///
    /// Returns the number of lines dispatched.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read, the errors file cannot be
    /// written or the results channel has been closed.
    pub fn run(mut self) -> io::Result<u64> {
        let mut input = BufReader::new(File::open(&self.path)?);
        let mut cursor = TailCursor::default();
        let mut idle = Duration::ZERO;
        let mut state = TailState::Reading;

        loop {
            state = match state {
                TailState::Reading => {
                    if self.read_available(&mut input, &mut cursor)? > 0 {
                        idle = Duration::ZERO;
                        TailState::Reading
                    } else {
                        TailState::Idle
                    }
                }
                TailState::Idle => {
                    if idle >= self.settings.follow_idle {
                        TailState::Exhausted
                    } else {
                        thread::sleep(self.settings.poll_interval);
                        idle += self.settings.poll_interval;
                        cursor.observe(input.get_ref().metadata()?.len())
                    }
                }
                TailState::Grown => {
                    idle = Duration::ZERO;
                    TailState::Reading
                }
                TailState::Truncated => {
                    info!("Input {} was truncated; reading from the start", self.path.display());
                    cursor = TailCursor::default();
                    idle = Duration::ZERO;
                    TailState::Reading
                }
                TailState::Exhausted => {
                    self.read_trailing(&mut input, &mut cursor)?;
                    break;
                }
            };
        }

        self.errors.flush()?;
        debug!("Reader finished after {} lines", self.next_index);
        Ok(self.next_index)
    }

    /// Dispatches every complete line after the cursor. Returns the number of
    /// lines dispatched.
    fn read_available(
        &mut self,
        input: &mut BufReader<File>,
        cursor: &mut TailCursor,
    ) -> io::Result<u64> {
        input.seek(SeekFrom::Start(cursor.position))?;
        let mut buf = Vec::new();
        let mut lines = 0;
        loop {
            buf.clear();
            let n = input.read_until(b'\n', &mut buf)? as u64;
            if n == 0 {
                cursor.pending = 0;
                break;
            }
            if buf.last() != Some(&b'\n') {
                cursor.pending = n;
                break;
            }
            cursor.position += n;
            self.dispatch(&buf)?;
            lines += 1;
        }
        Ok(lines)
    }

    /// Dispatches an unterminated final line, if any.
    fn read_trailing(
        &mut self,
        input: &mut BufReader<File>,
        cursor: &mut TailCursor,
    ) -> io::Result<()> {
        input.seek(SeekFrom::Start(cursor.position))?;
        let mut buf = Vec::new();
        input.read_to_end(&mut buf)?;
        if !buf.is_empty() {
            cursor.position += buf.len() as u64;
            cursor.pending = 0;
            self.dispatch(&buf)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, raw: &[u8]) -> io::Result<()> {
        let line = strip_terminator(raw);
        let text = String::from_utf8_lossy(line);
        let index = self.next_index;
        self.next_index += 1;
        self.counters.record_line_read();

        match classify(&text) {
            Ok(value) => self.submit(index, value),
            Err(reason) => self.reject_line(index, &text, reason),
        }
    }

    fn reject_line(&mut self, index: u64, text: &str, reason: InvalidReason) -> io::Result<()> {
        self.errors.report(index, text, &reason.to_string())?;
        self.counters.record_error();
        self.post(Message::Skip { index })
    }

    fn submit(&mut self, index: u64, value: i64) -> io::Result<()> {
        let permit = self.slots.acquire_owned();
        match self.submitter.submit(Job { index, value, permit }) {
            Ok(()) => {
                self.counters.record_submitted();
                Ok(())
            }
            Err(Rejected(job)) => {
                drop(job);
                warn!("Line {}: [{value}] -> rejected, worker queue is full", index + 1);
                self.post(Message::Skip { index })?;
                self.counters.record_error();
                Ok(())
            }
        }
    }

    fn post(&self, message: Message) -> io::Result<()> {
        self.results
            .send(message)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "results channel closed"))
    }
}

/// Drops a trailing `\n` or `\r\n`.
fn strip_terminator(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}
