//! Messages carried on the results channel.
//!
//! Every record read by the producer ends up as exactly one [`Message`] keyed
//! by its zero-based line index, either posted directly by the producer
//! (placeholders for malformed or rejected lines) or by a worker once the
//! computation completes. The consumer reassembles them by index.

use std::sync::Arc;

use num_bigint::BigUint;

use crate::reorder_buffer::Ranked;

/// A unit flowing through the results channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A successful computation.
    Result {
        /// Line index of the record.
        index: u64,
        /// The parsed input value.
        input: i64,
        /// The computed value.
        value: Arc<BigUint>,
    },
    /// The original text of a malformed record, merged into the output.
    RawError {
        /// Line index of the record.
        index: u64,
        /// The line exactly as read (without its terminator).
        text: String,
    },
    /// Free-form diagnostic text written at the record's position.
    ErrorNote {
        /// Line index of the record.
        index: u64,
        /// The diagnostic text.
        text: String,
    },
    /// The record produces no output line.
    Skip {
        /// Line index of the record.
        index: u64,
    },
    /// End of stream.
    Poison,
}

impl Message {
    /// The line index this message belongs to, `None` for [`Message::Poison`].
    #[must_use]
    pub fn index(&self) -> Option<u64> {
        match self {
            Self::Result { index, .. }
            | Self::RawError { index, .. }
            | Self::ErrorNote { index, .. }
            | Self::Skip { index } => Some(*index),
            Self::Poison => None,
        }
    }

    #[must_use]
    pub fn is_poison(&self) -> bool {
        matches!(self, Self::Poison)
    }

    /// Precedence used to resolve two messages for the same index.
    ///
    /// `Result > RawError > ErrorNote > Skip > Poison`.
    #[must_use]
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Result { .. } => 4,
            Self::RawError { .. } => 3,
            Self::ErrorNote { .. } => 2,
            Self::Skip { .. } => 1,
            Self::Poison => 0,
        }
    }

    /// Renders the output line for this message, if it produces one.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use num_bigint::BigUint;
    /// use factpipe_lib::message::Message;
    ///
    /// let msg = Message::Result { index: 0, input: 5, value: Arc::new(BigUint::from(120u32)) };
    /// assert_eq!(msg.render().as_deref(), Some("5 = 120"));
    /// assert_eq!(Message::Skip { index: 1 }.render(), None);
    /// ```
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Result { input, value, .. } => Some(format!("{input} = {value}")),
            Self::RawError { text, .. } | Self::ErrorNote { text, .. } => Some(text.clone()),
            Self::Skip { .. } | Self::Poison => None,
        }
    }
}

impl Ranked for Message {
    fn rank(&self) -> u8 {
        self.precedence()
    }
}
