use std::collections::VecDeque;
use std::sync::Arc;

use regroove_types::PatternTriple;

/// Bounded record of previously committed patterns, oldest first.
///
/// Entries are shared snapshots; nothing hands out mutable access to them.
pub struct PatternHistory {
    entries: VecDeque<Arc<PatternTriple>>,
    capacity: usize,
    /// Offset from the most recent entry of the next `step_back` recall.
    cursor: usize,
}

impl PatternHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Record a snapshot. Evicts the oldest entry at capacity and resets the
    /// recall cursor.
    pub fn append(&mut self, triple: Arc<PatternTriple>) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(triple);
        self.cursor = 0;
    }

    /// Entry `offset` places back from the most recent one (0 = newest).
    pub fn recall(&self, offset: usize) -> Option<Arc<PatternTriple>> {
        let index = self.entries.len().checked_sub(offset + 1)?;
        self.entries.get(index).cloned()
    }

    /// Recall the entry under the cursor and move the cursor one further back.
    /// Returns `None` (cursor unchanged) once the oldest entry has been passed.
    pub fn step_back(&mut self) -> Option<Arc<PatternTriple>> {
        let entry = self.recall(self.cursor)?;
        self.cursor += 1;
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PatternTriple>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regroove_types::{Cell, Shape};

    /// Triples distinguishable by the velocity stored at (0, 0).
    fn marked(n: usize) -> Arc<PatternTriple> {
        let cell = Cell {
            onset: 1.0,
            velocity: n as f32,
            offset: 0.0,
        };
        Arc::new(PatternTriple::empty(Shape::default()).with_cell(0, 0, cell).unwrap())
    }

    fn mark_of(triple: &PatternTriple) -> usize {
        triple.cell(0, 0).unwrap().velocity as usize
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut history = PatternHistory::new(100);
        for n in 0..101 {
            history.append(marked(n));
        }
        assert_eq!(history.len(), 100);
        let marks: Vec<usize> = history.iter().map(|t| mark_of(t)).collect();
        assert_eq!(marks, (1..101).collect::<Vec<_>>());
    }

    #[test]
    fn recall_counts_from_newest() {
        let mut history = PatternHistory::new(10);
        for n in 0..3 {
            history.append(marked(n));
        }
        assert_eq!(mark_of(&history.recall(0).unwrap()), 2);
        assert_eq!(mark_of(&history.recall(2).unwrap()), 0);
        assert!(history.recall(3).is_none());
    }

    #[test]
    fn step_back_walks_then_stops() {
        let mut history = PatternHistory::new(10);
        for n in 0..2 {
            history.append(marked(n));
        }
        assert_eq!(mark_of(&history.step_back().unwrap()), 1);
        assert_eq!(mark_of(&history.step_back().unwrap()), 0);
        assert!(history.step_back().is_none());
        assert_eq!(history.cursor(), 2);
    }

    #[test]
    fn append_resets_cursor() {
        let mut history = PatternHistory::new(10);
        history.append(marked(0));
        history.append(marked(1));
        history.step_back();
        history.step_back();
        history.append(marked(2));
        assert_eq!(history.cursor(), 0);
        assert_eq!(mark_of(&history.step_back().unwrap()), 2);
    }

    #[test]
    fn clear_empties_and_resets() {
        let mut history = PatternHistory::new(4);
        history.append(marked(0));
        history.step_back();
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), 0);
        assert!(history.step_back().is_none());
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut history = PatternHistory::new(0);
        history.append(marked(0));
        history.append(marked(1));
        assert_eq!(history.len(), 1);
        assert_eq!(history.capacity(), 1);
    }
}
