//! Undo/redo over clean document snapshots.

/// The history service the editor pushes clean HTML into.
pub trait History {
    /// Record a new state. Invalidates anything that could be redone.
    fn push(&mut self, html: String);
    /// Step back, returning the state to show.
    fn undo(&mut self) -> Option<String>;
    /// Step forward again, returning the state to show.
    fn redo(&mut self) -> Option<String>;
}

/// Snapshot history with a bounded number of undo levels.
#[derive(Debug)]
pub struct SnapshotHistory {
    current: Option<String>,
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            current: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

impl History for SnapshotHistory {
    fn push(&mut self, html: String) {
        if self.current.as_deref() == Some(html.as_str()) {
            return;
        }
        if let Some(previous) = self.current.replace(html) {
            self.undo_stack.push(previous);
            if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
                self.undo_stack.remove(0);
            }
        }
        self.redo_stack.clear();
    }

    fn undo(&mut self) -> Option<String> {
        let previous = self.undo_stack.pop()?;
        if let Some(current) = self.current.replace(previous.clone()) {
            self.redo_stack.push(current);
        }
        Some(previous)
    }

    fn redo(&mut self) -> Option<String> {
        let next = self.redo_stack.pop()?;
        if let Some(current) = self.current.replace(next.clone()) {
            self.undo_stack.push(current);
        }
        Some(next)
    }
}
