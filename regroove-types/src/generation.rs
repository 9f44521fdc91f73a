//! Generator configuration and session lifecycle types.

use serde::{Deserialize, Serialize};

use crate::pattern::{CHANNELS, LOOP_DURATION};

/// Lifecycle of a generation session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationState {
    /// No population has been built yet.
    #[default]
    Idle,
    /// A build is in flight; further requests are ignored.
    Building,
    /// A population is available for sampling.
    Ready,
}

/// Parameters handed to the rhythm model for one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub min_onset_threshold: f32,
    pub max_onset_threshold: f32,
    /// Requested population size; the model arranges it on a
    /// sqrt(n) × sqrt(n) density/sample lattice.
    pub num_samples: u32,
    pub note_dropout: f32,
    pub channels: usize,
    pub loop_duration: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_onset_threshold: 0.3,
            max_onset_threshold: 0.7,
            num_samples: 400,
            note_dropout: 0.5,
            channels: CHANNELS,
            loop_duration: LOOP_DURATION,
        }
    }
}

impl GeneratorConfig {
    /// Length of each population axis for the configured sample count.
    pub fn axis_length(&self) -> usize {
        (self.num_samples as f64).sqrt().floor() as usize
    }
}
