//! Current / source / temporary pattern slots.
//!
//! Slots hold `Arc<PatternTriple>`; a triple is never mutated after it is
//! installed, so anything holding a clone of a slot (history entries, the
//! marshaller) always sees a complete pattern.

use std::sync::Arc;

use regroove_types::{Cell, PatternTriple, Shape, ShapeError};

pub struct PatternStore {
    shape: Shape,
    current: Arc<PatternTriple>,
    source: Option<Arc<PatternTriple>>,
    stash: Option<Arc<PatternTriple>>,
}

impl PatternStore {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            current: Arc::new(PatternTriple::empty(shape)),
            source: None,
            stash: None,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn current(&self) -> &Arc<PatternTriple> {
        &self.current
    }

    /// The seed of the last completed generation, if any.
    pub fn source(&self) -> Option<&Arc<PatternTriple>> {
        self.source.as_ref()
    }

    pub fn has_stash(&self) -> bool {
        self.stash.is_some()
    }

    pub fn check_shape(&self, triple: &PatternTriple) -> Result<(), ShapeError> {
        if triple.shape() == self.shape {
            Ok(())
        } else {
            Err(ShapeError::Mismatch {
                onsets: self.shape,
                velocities: triple.shape(),
                offsets: triple.shape(),
            })
        }
    }

    /// Edit one cell: onset := value, velocity := value * scale, offset := 0.
    /// Out-of-range indices are logged and ignored.
    pub fn set_cell(&mut self, step: usize, channel: usize, value: f32, velocity_scale: f32) -> bool {
        let cell = Cell {
            onset: value,
            velocity: value * velocity_scale,
            offset: 0.0,
        };
        match self.current.with_cell(step, channel, cell) {
            Ok(next) => {
                self.current = Arc::new(next);
                true
            }
            Err(e) => {
                log::warn!("Invalid pattern index: {}", e);
                false
            }
        }
    }

    /// Swap in a new current pattern, returning the one it replaced.
    pub fn replace(&mut self, triple: Arc<PatternTriple>) -> Result<Arc<PatternTriple>, ShapeError> {
        self.check_shape(&triple)?;
        Ok(std::mem::replace(&mut self.current, triple))
    }

    pub fn set_source(&mut self, triple: Arc<PatternTriple>) -> Result<(), ShapeError> {
        self.check_shape(&triple)?;
        self.source = Some(triple);
        Ok(())
    }

    /// Move current into the temporary slot and install `triple`.
    pub fn stash_and_replace(&mut self, triple: Arc<PatternTriple>) -> Result<(), ShapeError> {
        let previous = self.replace(triple)?;
        self.stash = Some(previous);
        Ok(())
    }

    /// Put the stashed pattern back. No-op without an active stash.
    pub fn restore_stash(&mut self) -> bool {
        match self.stash.take() {
            Some(stashed) => {
                self.current = stashed;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regroove_types::{CHANNELS, LOOP_DURATION};

    fn store() -> PatternStore {
        PatternStore::new(Shape::new(LOOP_DURATION, CHANNELS))
    }

    fn pattern_with_onset(step: usize, channel: usize) -> Arc<PatternTriple> {
        let triple = PatternTriple::empty(Shape::new(LOOP_DURATION, CHANNELS))
            .with_cell(
                step,
                channel,
                Cell {
                    onset: 1.0,
                    velocity: 0.9,
                    offset: 1.0,
                },
            )
            .unwrap();
        Arc::new(triple)
    }

    #[test]
    fn set_cell_writes_only_that_cell() {
        let mut store = store();
        let before = store.current().clone();

        assert!(store.set_cell(3, 2, 1.0, 0.8));

        let after = store.current();
        let cell = after.cell(3, 2).unwrap();
        assert_eq!(cell.onset, 1.0);
        assert!((cell.velocity - 0.8).abs() < 1e-6);
        assert_eq!(cell.offset, 0.0);
        for step in 0..LOOP_DURATION {
            for channel in 0..CHANNELS {
                if (step, channel) != (3, 2) {
                    assert_eq!(after.cell(step, channel), before.cell(step, channel));
                }
            }
        }
        // the previous triple was not touched
        assert_eq!(before.onset_count(), 0);
    }

    #[test]
    fn set_cell_resets_offset() {
        let mut store = store();
        store.replace(pattern_with_onset(5, 1)).unwrap();
        store.set_cell(5, 1, 1.0, 0.5);
        assert_eq!(store.current().cell(5, 1).unwrap().offset, 0.0);
    }

    #[test]
    fn set_cell_out_of_range_is_ignored() {
        let mut store = store();
        let before = store.current().clone();
        assert!(!store.set_cell(LOOP_DURATION, 0, 1.0, 1.0));
        assert!(!store.set_cell(0, CHANNELS, 1.0, 1.0));
        assert!(Arc::ptr_eq(&before, store.current()));
    }

    #[test]
    fn replace_returns_previous() {
        let mut store = store();
        let first = store.current().clone();
        let next = pattern_with_onset(0, 0);
        let previous = store.replace(next.clone()).unwrap();
        assert!(Arc::ptr_eq(&previous, &first));
        assert!(Arc::ptr_eq(store.current(), &next));
    }

    #[test]
    fn replace_rejects_foreign_shape() {
        let mut store = store();
        let wrong = Arc::new(PatternTriple::empty(Shape::new(8, CHANNELS)));
        assert!(store.replace(wrong).is_err());
        assert_eq!(store.current().shape(), Shape::new(LOOP_DURATION, CHANNELS));
    }

    #[test]
    fn stash_round_trip_is_exact() {
        let mut store = store();
        store.set_cell(1, 1, 1.0, 0.7);
        let original = store.current().clone();

        store.stash_and_replace(pattern_with_onset(9, 4)).unwrap();
        assert!(store.has_stash());
        assert_ne!(**store.current(), *original);

        assert!(store.restore_stash());
        assert_eq!(**store.current(), *original);
        assert!(!store.has_stash());
    }

    #[test]
    fn restore_without_stash_is_noop() {
        let mut store = store();
        let before = store.current().clone();
        assert!(!store.restore_stash());
        assert!(Arc::ptr_eq(&before, store.current()));
    }
}
