use crate::stencil::snapshot::MaskSnapshot;

/// Bounded undo/redo stacks of mask snapshots for one layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaskHistory {
    undo_stack: Vec<MaskSnapshot>,
    redo_stack: Vec<MaskSnapshot>,
    limit: usize,
}

impl MaskHistory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit,
        }
    }

    /// Record the state before an edit. Drops the oldest entry past the limit
    /// and invalidates redo.
    pub fn commit(&mut self, before: MaskSnapshot) {
        if self.limit == 0 {
            return;
        }
        self.undo_stack.push(before);
        if self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Pop the previous state, stashing `current` for redo.
    pub fn undo(&mut self, current: MaskSnapshot) -> Option<MaskSnapshot> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: MaskSnapshot) -> Option<MaskSnapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn byte_size(&self) -> usize {
        self.undo_stack
            .iter()
            .chain(&self.redo_stack)
            .map(MaskSnapshot::byte_size)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::mask::{Mask, MaskResolution};
    use crate::stencil::snapshot::SnapshotEncoding;

    fn snapshot(value: u16) -> MaskSnapshot {
        MaskSnapshot::capture(
            &Mask::filled(MaskResolution::R128, value),
            SnapshotEncoding::Zlib,
        )
        .unwrap()
    }

    #[test]
    fn new_commit_clears_redo_stack() {
        let mut history = MaskHistory::with_limit(8);
        history.commit(snapshot(0));
        let _ = history.undo(snapshot(1));
        assert_eq!(history.redo_len(), 1);

        history.commit(snapshot(2));
        assert_eq!(history.redo_len(), 0);
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn undo_redo_swaps_states() {
        let mut history = MaskHistory::with_limit(8);
        history.commit(snapshot(0));
        history.commit(snapshot(1));

        assert_eq!(history.undo(snapshot(2)), Some(snapshot(1)));
        assert_eq!(history.undo(snapshot(1)), Some(snapshot(0)));
        assert_eq!(history.undo(snapshot(0)), None);

        assert_eq!(history.redo(snapshot(0)), Some(snapshot(1)));
        assert_eq!(history.redo(snapshot(1)), Some(snapshot(2)));
        assert_eq!(history.redo(snapshot(2)), None);
    }

    #[test]
    fn limit_drops_oldest_entries() {
        let mut history = MaskHistory::with_limit(2);
        for v in 0..5 {
            history.commit(snapshot(v));
        }
        assert_eq!(history.undo_len(), 2);
        assert_eq!(history.undo(snapshot(9)), Some(snapshot(4)));
        assert_eq!(history.undo(snapshot(4)), Some(snapshot(3)));
        assert_eq!(history.undo(snapshot(3)), None);
    }

    #[test]
    fn zero_limit_disables_history() {
        let mut history = MaskHistory::with_limit(0);
        history.commit(snapshot(1));
        assert_eq!(history.undo_len(), 0);
        assert_eq!(history.byte_size(), 0);
    }
}
