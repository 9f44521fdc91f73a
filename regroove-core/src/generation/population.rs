use serde::{Deserialize, Serialize};
use thiserror::Error;

use regroove_types::{PatternTriple, Shape};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PopulationError {
    #[error("population of {density_axis}x{sample_axis} needs {expected} candidates, got {found}")]
    Count {
        density_axis: usize,
        sample_axis: usize,
        expected: usize,
        found: usize,
    },
    #[error("candidate {index} has shape {found}, expected {expected}")]
    Shape {
        index: usize,
        expected: Shape,
        found: Shape,
    },
}

/// Candidates laid out on a (density × sample) lattice, density-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPopulation")]
pub struct CandidatePopulation {
    density_axis: usize,
    sample_axis: usize,
    candidates: Vec<PatternTriple>,
}

#[derive(Deserialize)]
struct RawPopulation {
    density_axis: usize,
    sample_axis: usize,
    candidates: Vec<PatternTriple>,
}

impl TryFrom<RawPopulation> for CandidatePopulation {
    type Error = PopulationError;

    fn try_from(raw: RawPopulation) -> Result<Self, Self::Error> {
        CandidatePopulation::new(raw.density_axis, raw.sample_axis, raw.candidates)
    }
}

impl CandidatePopulation {
    /// All candidates must share the shape of the first one.
    pub fn new(
        density_axis: usize,
        sample_axis: usize,
        candidates: Vec<PatternTriple>,
    ) -> Result<Self, PopulationError> {
        let expected = density_axis * sample_axis;
        if candidates.len() != expected {
            return Err(PopulationError::Count {
                density_axis,
                sample_axis,
                expected,
                found: candidates.len(),
            });
        }
        if let Some(first) = candidates.first() {
            let shape = first.shape();
            if let Some((index, bad)) = candidates
                .iter()
                .enumerate()
                .find(|(_, c)| c.shape() != shape)
            {
                return Err(PopulationError::Shape {
                    index,
                    expected: shape,
                    found: bad.shape(),
                });
            }
        }
        Ok(Self {
            density_axis,
            sample_axis,
            candidates,
        })
    }

    pub fn density_axis(&self) -> usize {
        self.density_axis
    }

    pub fn sample_axis(&self) -> usize {
        self.sample_axis
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Shape of the candidates, `None` for an empty population.
    pub fn shape(&self) -> Option<Shape> {
        self.candidates.first().map(|c| c.shape())
    }

    pub fn get(&self, density: usize, sample: usize) -> Option<&PatternTriple> {
        if density >= self.density_axis || sample >= self.sample_axis {
            return None;
        }
        self.candidates.get(density * self.sample_axis + sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_must_match_axes() {
        let err = CandidatePopulation::new(2, 2, vec![PatternTriple::default(); 3]).unwrap_err();
        assert!(matches!(err, PopulationError::Count { expected: 4, found: 3, .. }));
    }

    #[test]
    fn mixed_shapes_are_rejected() {
        let candidates = vec![
            PatternTriple::default(),
            PatternTriple::empty(Shape::new(8, 9)),
        ];
        let err = CandidatePopulation::new(1, 2, candidates).unwrap_err();
        assert!(matches!(err, PopulationError::Shape { index: 1, .. }));
    }

    #[test]
    fn get_is_bounds_checked() {
        let population = CandidatePopulation::new(2, 3, vec![PatternTriple::default(); 6]).unwrap();
        assert!(population.get(1, 2).is_some());
        assert!(population.get(2, 0).is_none());
        assert!(population.get(0, 3).is_none());
    }

    #[test]
    fn deserialize_validates() {
        let json = serde_json::json!({
            "density_axis": 2,
            "sample_axis": 2,
            "candidates": [],
        });
        assert!(serde_json::from_value::<CandidatePopulation>(json).is_err());
    }
}
