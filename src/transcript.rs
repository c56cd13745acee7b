//! The ordered record of completed exchanges.

use std::slice;

use time::OffsetDateTime;

/// Who wrote a transcript entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Author {
    /// This client's user.
    Local,
    /// The server.
    Remote,
}

/// One line of the transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// Who wrote the line.
    pub author: Author,
    /// The text exactly as sent or received.
    pub text: String,
    /// When the exchange completed.
    pub at: OffsetDateTime,
}

/// Append-only, chronological sequence of [`TranscriptEntry`].
///
/// Entries arrive in pairs: a [`Author::Local`] line immediately followed by
/// the [`Author::Remote`] reply to it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entries in order.
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been exchanged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> slice::Iter<'_, TranscriptEntry> {
        self.entries.iter()
    }

    /// Returns the most recent entry.
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub(crate) fn push_exchange(&mut self, sent: String, reply: String, at: OffsetDateTime) {
        self.entries.reserve(2);
        self.entries.push(TranscriptEntry {
            author: Author::Local,
            text: sent,
            at,
        });
        self.entries.push(TranscriptEntry {
            author: Author::Remote,
            text: reply,
            at,
        });
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a TranscriptEntry;
    type IntoIter = slice::Iter<'a, TranscriptEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
