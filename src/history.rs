//! Linear undo/redo over full scene snapshots.
//!
//! Each entry is a complete copy of the object list. The cursor points at the
//! entry matching the live scene; saving discards everything after the cursor
//! before pushing, so redo is only possible until the next committed change.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use crate::doc::SceneObject;

/// Bounded snapshot stack with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Vec<SceneObject>>,
    cursor: usize,
    limit: usize,
}

impl History {
    /// Create a history holding at most `limit` entries (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(Vec::new());
        Self { entries, cursor: 0, limit: limit.max(1) }
    }

    /// Drop every entry and start over from `initial`.
    pub fn reset(&mut self, initial: Vec<SceneObject>) {
        self.entries.clear();
        self.entries.push_back(initial);
        self.cursor = 0;
    }

    /// Record a committed state. Redo entries past the cursor are discarded and
    /// the oldest entry is evicted once the limit is exceeded.
    pub fn save(&mut self, objects: Vec<SceneObject>) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(objects);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one entry. `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&[SceneObject]> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).map(Vec::as_slice)
    }

    /// Step forward one entry. `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&[SceneObject]> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor).map(Vec::as_slice)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Index of the current entry.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
