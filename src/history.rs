//! Undo/redo stacks for recorded edit actions.
//!
//! Only annotation creation is recorded; style edits and moves are not.
//! The enums are shaped so further action kinds can be added without
//! reworking the stacks.

use crate::model::Annotation;

/// An action sitting on the undo stack, referencing live document state.
#[derive(Clone, Debug)]
pub enum Recorded {
    Create { id: u32 },
}

/// An undone action sitting on the redo stack. Creation carries the full
/// annotation value, so redo restores position and style exactly as they
/// were when the undo happened (later edits included).
#[derive(Clone, Debug)]
pub enum Undone {
    Create { annotation: Annotation },
}

#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<Recorded>,
    redo_stack: Vec<Undone>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh creation. Any pending redo entries are invalidated.
    pub fn record_create(&mut self, id: u32) {
        self.undo_stack.push(Recorded::Create { id });
        self.redo_stack.clear();
    }

    pub fn pop_undo(&mut self) -> Option<Recorded> {
        self.undo_stack.pop()
    }

    pub fn push_undone(&mut self, undone: Undone) {
        self.redo_stack.push(undone);
    }

    pub fn pop_redo(&mut self) -> Option<Undone> {
        self.redo_stack.pop()
    }

    /// Re-arm the undo stack after a redo re-applied an action.
    pub fn push_recorded(&mut self, recorded: Recorded) {
        self.undo_stack.push(recorded);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Drop everything, e.g. when a new image replaces the document.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_clears_redo() {
        let mut history = History::new();
        history.record_create(1);
        let Recorded::Create { id } = history.pop_undo().unwrap();
        history.push_undone(Undone::Create {
            annotation: crate::model::Annotation::new(
                id,
                (0.0, 0.0),
                "x".into(),
                &crate::model::LabelStyle::default(),
                (100.0, 100.0),
            ),
        });
        assert!(history.can_redo());

        history.record_create(2);
        assert!(!history.can_redo());
        assert!(history.can_undo());
    }

    #[test]
    fn empty_stacks_pop_nothing() {
        let mut history = History::new();
        assert!(history.pop_undo().is_none());
        assert!(history.pop_redo().is_none());
    }
}
