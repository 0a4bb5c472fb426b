//! Fixed-capacity ring of recent assistant utterances.

use std::collections::VecDeque;

/// Number of utterances kept.
pub const NOTES_CAPACITY: usize = 8;

/// Keeps the last [`NOTES_CAPACITY`] notes, dropping the oldest on overflow.
#[derive(Clone, Debug, Default)]
pub struct NotesBuffer {
    items: VecDeque<String>,
}

impl NotesBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self {
            items: VecDeque::with_capacity(NOTES_CAPACITY),
        }
    }

    /// Append a note, evicting the oldest when full.
    pub fn push(&mut self, note: String) {
        if self.items.len() == NOTES_CAPACITY {
            let _ = self.items.pop_front();
        }
        self.items.push_back(note);
    }

    /// Notes from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Number of stored notes.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no notes are stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
