use std::collections::VecDeque;

use crate::canvas::GridState;

/// Default undo depth.
pub const DEFAULT_HISTORY_SIZE: usize = 10;

// ============================================================================
// GRID SNAPSHOT
// ============================================================================

/// A deep copy of the grid taken before an undoable change.
#[derive(Clone, Debug, PartialEq)]
pub struct GridSnapshot {
    pub description: String,
    pub grid: GridState,
}

impl GridSnapshot {
    pub fn capture(description: impl Into<String>, grid: &GridState) -> Self {
        Self {
            description: description.into(),
            grid: grid.clone(),
        }
    }
}

/// Pre-gesture copy held between pointer-down and pointer-up.
#[derive(Clone, Debug)]
struct PendingGesture {
    description: String,
    before: GridState,
}

// ============================================================================
// HISTORY MANAGER - bounded undo/redo stacks of grid snapshots
// ============================================================================

/// Undo/redo history over whole-grid snapshots.
///
/// One entry per gesture: `begin_gesture` copies the grid, `end_gesture`
/// pushes that copy only if the grid changed in between.
#[derive(Debug)]
pub struct HistoryManager {
    undo_stack: VecDeque<GridSnapshot>,
    redo_stack: VecDeque<GridSnapshot>,
    max_history_size: usize,
    pending: Option<PendingGesture>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(1),
            pending: None,
        }
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    /// Record `snapshot` as the state to return to on undo.
    pub fn push(&mut self, snapshot: GridSnapshot) {
        // A new action invalidates everything that was undone
        self.redo_stack.clear();
        self.undo_stack.push_back(snapshot);
        self.prune();
    }

    /// Start tracking a gesture. A gesture already in progress is replaced.
    pub fn begin_gesture(&mut self, description: impl Into<String>, grid: &GridState) {
        self.pending = Some(PendingGesture {
            description: description.into(),
            before: grid.clone(),
        });
    }

    pub fn gesture_active(&self) -> bool {
        self.pending.is_some()
    }

    /// Close the current gesture. Returns true when an undo step was pushed.
    pub fn end_gesture(&mut self, grid: &GridState) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        if pending.before == *grid {
            return false;
        }
        self.push(GridSnapshot {
            description: pending.description,
            grid: pending.before,
        });
        true
    }

    /// Drop the current gesture without recording it.
    pub fn cancel_gesture(&mut self) {
        self.pending = None;
    }

    /// Restore the most recent snapshot into `grid`.
    /// Returns its description, or `None` when there is nothing to undo.
    pub fn undo(&mut self, grid: &mut GridState) -> Option<String> {
        let snapshot = self.undo_stack.pop_back()?;
        let current = std::mem::replace(grid, snapshot.grid);
        let description = snapshot.description;
        self.redo_stack.push_back(GridSnapshot {
            description: description.clone(),
            grid: current,
        });
        Some(description)
    }

    pub fn redo(&mut self, grid: &mut GridState) -> Option<String> {
        let snapshot = self.redo_stack.pop_back()?;
        let current = std::mem::replace(grid, snapshot.grid);
        let description = snapshot.description;
        self.undo_stack.push_back(GridSnapshot {
            description: description.clone(),
            grid: current,
        });
        self.prune();
        Some(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|s| s.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|s| s.description.as_str())
    }

    /// Get all undo descriptions (most recent first)
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|s| s.description.clone()).collect()
    }

    /// Evict the oldest snapshots beyond the size limit.
    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            self.undo_stack.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending = None;
    }

    /// Undo `count` steps, stopping early when the stack runs out.
    pub fn undo_to(&mut self, count: usize, grid: &mut GridState) -> usize {
        let mut undone = 0;
        while undone < count && self.undo(grid).is_some() {
            undone += 1;
        }
        undone
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}
