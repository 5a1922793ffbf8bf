//! Snapshot history for undo/redo.

use image::RgbaImage;

/// Default maximum number of snapshots to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// Default cap on the pixel bytes held by all snapshots together (256 MiB).
pub const MAX_HISTORY_BYTES: usize = 256 * 1024 * 1024;

/// Linear list of full-surface snapshots with a cursor.
///
/// The cursor is `None` when the list is empty, and also after undoing past
/// the first entry; in that state the visible surface is blank and `redo`
/// restores entry 0. Once the size limit has dropped old entries, entry 0 is
/// no longer the first state and undo stops there.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<RgbaImage>,
    cursor: Option<usize>,
    limit: usize,
    /// Byte budget across all entries; the newest entry is always kept.
    max_bytes: usize,
    /// Entries were dropped from the front to honor `limit`.
    trimmed: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_UNDO_HISTORY)
    }
}

impl History {
    /// Create an empty history keeping at most `limit` snapshots (minimum 1).
    pub fn new(limit: usize) -> Self {
        Self::with_budget(limit, MAX_HISTORY_BYTES)
    }

    /// Like [`new`](Self::new), also dropping the oldest snapshots while the
    /// total exceeds `max_bytes`.
    pub fn with_budget(limit: usize, max_bytes: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            limit: limit.max(1),
            max_bytes,
            trimmed: false,
        }
    }

    /// Pixel bytes held by all snapshots.
    pub fn bytes(&self) -> usize {
        self.entries.iter().map(|e| e.as_raw().len()).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Snapshot under the cursor.
    pub fn current(&self) -> Option<&RgbaImage> {
        self.cursor.and_then(|i| self.entries.get(i))
    }

    /// Drop every entry after the cursor (the redo branch).
    pub fn truncate_future(&mut self) {
        let keep = self.cursor.map_or(0, |i| i + 1);
        self.entries.truncate(keep);
    }

    /// Append a snapshot after the cursor, discarding the redo branch, and
    /// move the cursor onto it.
    pub fn push(&mut self, snapshot: RgbaImage) {
        self.truncate_future();
        self.entries.push(snapshot);

        // Limit history size
        let mut excess = self.entries.len().saturating_sub(self.limit);
        let mut bytes: usize = self.entries[excess..].iter().map(|e| e.as_raw().len()).sum();
        for entry in &self.entries[excess..] {
            if bytes <= self.max_bytes || excess + 1 >= self.entries.len() {
                break;
            }
            bytes -= entry.as_raw().len();
            excess += 1;
        }
        if excess > 0 {
            self.entries.drain(..excess);
            self.trimmed = true;
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Whether `undo` would change anything.
    pub fn can_undo(&self) -> bool {
        match self.cursor {
            Some(0) => !self.trimmed,
            Some(_) => true,
            None => false,
        }
    }

    /// Whether `redo` would change anything.
    pub fn can_redo(&self) -> bool {
        match self.cursor {
            Some(i) => i + 1 < self.entries.len(),
            None => !self.entries.is_empty(),
        }
    }

    /// Step back. Returns the step taken, or `None` at the boundary.
    pub fn undo(&mut self) -> Option<Step<'_>> {
        match self.cursor {
            Some(0) if self.trimmed => None,
            Some(0) => {
                self.cursor = None;
                Some(Step::Cleared)
            }
            Some(i) => {
                self.cursor = Some(i - 1);
                Some(Step::Restore(&self.entries[i - 1]))
            }
            None => None,
        }
    }

    /// Step forward. Returns the snapshot to restore, or `None` at the last entry.
    pub fn redo(&mut self) -> Option<&RgbaImage> {
        if !self.can_redo() {
            return None;
        }
        let next = self.cursor.map_or(0, |i| i + 1);
        self.cursor = Some(next);
        self.entries.get(next)
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.trimmed = false;
    }
}

/// Outcome of an undo step.
#[derive(Debug, PartialEq)]
pub enum Step<'a> {
    /// Restore this snapshot.
    Restore(&'a RgbaImage),
    /// Stepped before the first snapshot: show a blank surface.
    Cleared,
}
