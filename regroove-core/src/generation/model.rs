//! Rhythm models: turn a seed pattern into a candidate population.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use regroove_types::{Grid, GeneratorConfig, PatternTriple, Shape};

use super::population::{CandidatePopulation, PopulationError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("sample count {0} gives an empty population")]
    EmptyPopulation(u32),
    #[error("seed shape {seed} does not match configured {configured}")]
    SeedShape { seed: Shape, configured: Shape },
    #[error("onset thresholds out of order: min {min} > max {max}")]
    Thresholds { min: f32, max: f32 },
    #[error(transparent)]
    Population(#[from] PopulationError),
    #[error("model failure: {0}")]
    Other(String),
}

/// A generator of candidate patterns.
///
/// `build` runs on a worker thread, so implementations must be `Send`.
pub trait RhythmModel: Send {
    fn build(
        &mut self,
        seed: &PatternTriple,
        config: &GeneratorConfig,
    ) -> Result<CandidatePopulation, ModelError>;
}

/// Built-in model that perturbs the seed.
///
/// Each density row uses an onset threshold interpolated between the
/// configured min (row 0, densest) and max. A cell's score is its seed
/// strength plus uniform noise; seed strength is withheld with probability
/// `note_dropout`. Cells scoring above the row threshold become onsets.
pub struct VariationModel {
    rng: StdRng,
}

/// Upper bound of the noise added to each cell score.
const NOISE: f32 = 0.6;

impl VariationModel {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn candidate(&mut self, seed: &PatternTriple, config: &GeneratorConfig, threshold: f32) -> PatternTriple {
        let shape = seed.shape();
        let mut onsets = Vec::with_capacity(shape.cell_count());
        let mut velocities = Vec::with_capacity(shape.cell_count());
        let mut offsets = Vec::with_capacity(shape.cell_count());

        for step in 0..shape.steps {
            for channel in 0..shape.channels {
                let cell = seed.cell(step, channel).unwrap_or(regroove_types::Cell {
                    onset: 0.0,
                    velocity: 0.0,
                    offset: 0.0,
                });
                let seeded = cell.onset == 1.0 && !self.rng.gen_bool(config.note_dropout.clamp(0.0, 1.0) as f64);
                let strength = if seeded { 0.5 + 0.5 * cell.velocity } else { 0.0 };
                let score = strength + self.rng.gen_range(0.0..NOISE);

                if score > threshold {
                    let (velocity, offset) = if seeded {
                        (
                            cell.velocity + self.rng.gen_range(-0.1..0.1),
                            cell.offset + self.rng.gen_range(-0.1..0.1),
                        )
                    } else {
                        (self.rng.gen_range(0.3..1.0), self.rng.gen_range(-0.5..0.5))
                    };
                    onsets.push(1.0);
                    velocities.push(velocity.clamp(0.0, 1.0));
                    offsets.push(offset.clamp(-1.0, 1.0));
                } else {
                    onsets.push(0.0);
                    velocities.push(0.0);
                    offsets.push(0.0);
                }
            }
        }

        // Vectors are built to `shape`, so construction cannot fail.
        let grid = |cells| Grid::from_cells(shape, cells).unwrap_or_else(|_| Grid::zeros(shape));
        PatternTriple::new(grid(onsets), grid(velocities), grid(offsets))
            .unwrap_or_else(|_| PatternTriple::empty(shape))
    }
}

impl Default for VariationModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RhythmModel for VariationModel {
    fn build(
        &mut self,
        seed: &PatternTriple,
        config: &GeneratorConfig,
    ) -> Result<CandidatePopulation, ModelError> {
        let configured = Shape::new(config.loop_duration, config.channels);
        if seed.shape() != configured {
            return Err(ModelError::SeedShape {
                seed: seed.shape(),
                configured,
            });
        }
        if config.min_onset_threshold > config.max_onset_threshold {
            return Err(ModelError::Thresholds {
                min: config.min_onset_threshold,
                max: config.max_onset_threshold,
            });
        }
        let axis = config.axis_length();
        if axis == 0 {
            return Err(ModelError::EmptyPopulation(config.num_samples));
        }

        let span = config.max_onset_threshold - config.min_onset_threshold;
        let mut candidates = Vec::with_capacity(axis * axis);
        for density in 0..axis {
            let t = if axis > 1 { density as f32 / (axis - 1) as f32 } else { 0.0 };
            let threshold = config.min_onset_threshold + span * t;
            for _ in 0..axis {
                candidates.push(self.candidate(seed, config, threshold));
            }
        }
        log::debug!(target: "generator", "built {}x{} candidates", axis, axis);
        Ok(CandidatePopulation::new(axis, axis, candidates)?)
    }
}
