//! Pattern triple: onsets, velocities and micro-timing offsets over a
//! (steps × channels) grid.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Steps in one loop.
pub const LOOP_DURATION: usize = 16;
/// Instrument lanes.
pub const CHANNELS: usize = 9;

/// Dimensions shared by all three grids of a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub steps: usize,
    pub channels: usize,
}

impl Shape {
    pub const fn new(steps: usize, channels: usize) -> Self {
        Self { steps, channels }
    }

    pub fn cell_count(&self) -> usize {
        self.steps * self.channels
    }

    pub fn contains(&self, step: usize, channel: usize) -> bool {
        step < self.steps && channel < self.channels
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::new(LOOP_DURATION, CHANNELS)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.steps, self.channels)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("grid of shape {shape} needs {expected} cells, got {found}")]
    CellCount {
        shape: Shape,
        expected: usize,
        found: usize,
    },
    #[error("grid shapes differ: onsets {onsets}, velocities {velocities}, offsets {offsets}")]
    Mismatch {
        onsets: Shape,
        velocities: Shape,
        offsets: Shape,
    },
    #[error("cell [{step}, {channel}] is outside {shape}")]
    OutOfBounds {
        step: usize,
        channel: usize,
        shape: Shape,
    },
}

/// Row-major (step, channel) grid of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct Grid {
    shape: Shape,
    cells: Vec<f32>,
}

#[derive(Deserialize)]
struct RawGrid {
    shape: Shape,
    cells: Vec<f32>,
}

impl TryFrom<RawGrid> for Grid {
    type Error = ShapeError;

    fn try_from(raw: RawGrid) -> Result<Self, Self::Error> {
        Grid::from_cells(raw.shape, raw.cells)
    }
}

impl Grid {
    pub fn zeros(shape: Shape) -> Self {
        Self {
            shape,
            cells: vec![0.0; shape.cell_count()],
        }
    }

    pub fn from_cells(shape: Shape, cells: Vec<f32>) -> Result<Self, ShapeError> {
        if cells.len() != shape.cell_count() {
            return Err(ShapeError::CellCount {
                shape,
                expected: shape.cell_count(),
                found: cells.len(),
            });
        }
        Ok(Self { shape, cells })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn get(&self, step: usize, channel: usize) -> Option<f32> {
        if self.shape.contains(step, channel) {
            Some(self.cells[step * self.shape.channels + channel])
        } else {
            None
        }
    }

    fn set(&mut self, step: usize, channel: usize, value: f32) {
        let idx = step * self.shape.channels + channel;
        self.cells[idx] = value;
    }
}

/// Values of one (step, channel) cell across the three grids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub onset: f32,
    pub velocity: f32,
    pub offset: f32,
}

/// The (onsets, velocities, offsets) grid set describing one loop.
///
/// The three grids always share one shape. A triple is never edited in place:
/// [`PatternTriple::with_cell`] returns a new triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTriple")]
pub struct PatternTriple {
    onsets: Grid,
    velocities: Grid,
    offsets: Grid,
}

#[derive(Deserialize)]
struct RawTriple {
    onsets: Grid,
    velocities: Grid,
    offsets: Grid,
}

impl TryFrom<RawTriple> for PatternTriple {
    type Error = ShapeError;

    fn try_from(raw: RawTriple) -> Result<Self, Self::Error> {
        PatternTriple::new(raw.onsets, raw.velocities, raw.offsets)
    }
}

impl Default for PatternTriple {
    fn default() -> Self {
        Self::empty(Shape::default())
    }
}

impl PatternTriple {
    pub fn empty(shape: Shape) -> Self {
        Self {
            onsets: Grid::zeros(shape),
            velocities: Grid::zeros(shape),
            offsets: Grid::zeros(shape),
        }
    }

    pub fn new(onsets: Grid, velocities: Grid, offsets: Grid) -> Result<Self, ShapeError> {
        if onsets.shape() != velocities.shape() || onsets.shape() != offsets.shape() {
            return Err(ShapeError::Mismatch {
                onsets: onsets.shape(),
                velocities: velocities.shape(),
                offsets: offsets.shape(),
            });
        }
        Ok(Self {
            onsets,
            velocities,
            offsets,
        })
    }

    pub fn shape(&self) -> Shape {
        self.onsets.shape()
    }

    pub fn onsets(&self) -> &Grid {
        &self.onsets
    }

    pub fn velocities(&self) -> &Grid {
        &self.velocities
    }

    pub fn offsets(&self) -> &Grid {
        &self.offsets
    }

    pub fn cell(&self, step: usize, channel: usize) -> Option<Cell> {
        Some(Cell {
            onset: self.onsets.get(step, channel)?,
            velocity: self.velocities.get(step, channel)?,
            offset: self.offsets.get(step, channel)?,
        })
    }

    /// Copy of this triple with one cell replaced.
    pub fn with_cell(&self, step: usize, channel: usize, cell: Cell) -> Result<Self, ShapeError> {
        let shape = self.shape();
        if !shape.contains(step, channel) {
            return Err(ShapeError::OutOfBounds {
                step,
                channel,
                shape,
            });
        }
        let mut next = self.clone();
        next.onsets.set(step, channel, cell.onset);
        next.velocities.set(step, channel, cell.velocity);
        next.offsets.set(step, channel, cell.offset);
        Ok(next)
    }

    pub fn onset_count(&self) -> usize {
        self.onsets.cells().iter().filter(|&&v| v == 1.0).count()
    }
}
