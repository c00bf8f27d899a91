//! Session history: the browser's back/forward stack
//!
//! Entries pair a path with a snapshot of the frame committed for it. Only
//! the primary navigation controller writes here; overlays never do.

use crate::frame::Frame;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub path: String,
    pub frame: Arc<Frame>,
}

impl HistoryEntry {
    pub fn new(frame: Arc<Frame>) -> Self {
        Self {
            path: frame.path.clone(),
            frame,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry after the cursor, dropping any forward entries
    pub fn push(&mut self, entry: HistoryEntry) {
        if let Some(cursor) = self.cursor {
            self.entries.truncate(cursor + 1);
        }
        self.entries.push(entry);
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Overwrite the entry under the cursor; pushes when history is empty
    pub fn replace(&mut self, entry: HistoryEntry) {
        match self.cursor {
            Some(cursor) => self.entries[cursor] = entry,
            None => self.push(entry),
        }
    }

    /// Index and entry one step behind the cursor; the cursor stays put
    pub fn back_target(&self) -> Option<(usize, &HistoryEntry)> {
        let index = self.cursor.filter(|c| *c > 0)? - 1;
        self.entries.get(index).map(|entry| (index, entry))
    }

    /// Index and entry one step ahead of the cursor; the cursor stays put
    pub fn forward_target(&self) -> Option<(usize, &HistoryEntry)> {
        let index = self.cursor.filter(|c| c + 1 < self.entries.len())? + 1;
        self.entries.get(index).map(|entry| (index, entry))
    }

    /// Move the cursor to `index` and overwrite the entry there.
    /// An index past the end falls back to a push.
    pub fn traverse(&mut self, index: usize, entry: HistoryEntry) {
        match self.entries.get_mut(index) {
            Some(slot) => {
                *slot = entry;
                self.cursor = Some(index);
            }
            None => self.push(entry),
        }
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    pub fn can_go_back(&self) -> bool {
        self.back_target().is_some()
    }

    pub fn can_go_forward(&self) -> bool {
        self.forward_target().is_some()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
