//! Events emitted to the host after a pattern change.

use serde::{Deserialize, Serialize};

/// One `(step, channel, value)` triplet of the display grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub step: u32,
    /// External (display) channel index.
    pub channel: u32,
    pub value: f32,
}

/// Display-grid encoding: parallel onset and velocity sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayGrid {
    pub onsets: Vec<GridCell>,
    pub velocities: Vec<GridCell>,
}

/// One scheduled note: absolute sub-step tick, internal channel, velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEvent {
    pub tick: i64,
    pub channel: u32,
    pub velocity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutboundEvent {
    FillOnsets(Vec<GridCell>),
    FillVelocities(Vec<GridCell>),
    EventSequence(Vec<PlaybackEvent>),
    /// Informational is-syncing flag at the time of emission.
    SyncState(bool),
    GeneratorReady {
        density_axis: usize,
        sample_axis: usize,
    },
}
