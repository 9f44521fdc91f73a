//! Generation orchestrator: single-flight candidate builds on a worker thread.
//!
//! The model is moved into the worker for the duration of a build and sent
//! back with the result, so "building" and "model away" are the same state.

pub mod model;
pub mod population;
pub mod session;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use regroove_types::{GenerationState, GeneratorConfig, PatternTriple, Shape};

pub use model::{ModelError, RhythmModel, VariationModel};
pub use population::{CandidatePopulation, PopulationError};
pub use session::{GeneratorSession, SessionError};

/// Result of a build, sent from the worker back to the owner.
pub struct BuildFeedback {
    id: u64,
    model: Box<dyn RhythmModel>,
    seed: Arc<PatternTriple>,
    config: GeneratorConfig,
    result: Result<CandidatePopulation, ModelError>,
}

/// A completed build, as seen by the engine.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub seed: Arc<PatternTriple>,
    pub density_axis: usize,
    pub sample_axis: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("generator is not ready")]
    NotReady,
    #[error("no such candidate [{density}, {sample}] in {density_axis}x{sample_axis}")]
    NoSuchCandidate {
        density: i32,
        sample: usize,
        density_axis: usize,
        sample_axis: usize,
    },
}

pub struct GenerationOrchestrator {
    state: GenerationState,
    model: Option<Box<dyn RhythmModel>>,
    population: Option<Arc<CandidatePopulation>>,
    /// Configuration the current population was built with.
    built_with: Option<GeneratorConfig>,
    state_dir: Option<PathBuf>,
    build_id: u64,
    feedback_tx: Sender<BuildFeedback>,
    feedback_rx: Receiver<BuildFeedback>,
}

impl GenerationOrchestrator {
    pub fn new(model: Box<dyn RhythmModel>, state_dir: Option<PathBuf>) -> Self {
        let (feedback_tx, feedback_rx) = crossbeam_channel::unbounded();
        Self {
            state: GenerationState::Idle,
            model: Some(model),
            population: None,
            built_with: None,
            state_dir,
            build_id: 0,
            feedback_tx,
            feedback_rx,
        }
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == GenerationState::Ready
    }

    pub fn population(&self) -> Option<&Arc<CandidatePopulation>> {
        self.population.as_ref()
    }

    /// Receiver the owner selects on to learn about finished builds.
    pub fn feedback_receiver(&self) -> &Receiver<BuildFeedback> {
        &self.feedback_rx
    }

    /// Start a build from `seed`. Ignored while a build is in flight.
    pub fn generate(&mut self, seed: Arc<PatternTriple>, config: GeneratorConfig) -> bool {
        if self.state == GenerationState::Building {
            log::debug!(target: "generator", "generate ignored: build in progress");
            return false;
        }
        let Some(mut model) = self.model.take() else {
            log::warn!(target: "generator", "generate ignored: no model available");
            return false;
        };

        self.build_id += 1;
        let id = self.build_id;
        let tx = self.feedback_tx.clone();
        self.state = GenerationState::Building;
        log::info!(
            target: "generator",
            "Generating {} candidates, note dropout {}, threshold range [{}:{}]",
            config.num_samples,
            config.note_dropout,
            config.min_onset_threshold,
            config.max_onset_threshold
        );

        thread::spawn(move || {
            let result = model.build(&seed, &config);
            let _ = tx.send(BuildFeedback {
                id,
                model,
                seed,
                config,
                result,
            });
        });
        true
    }

    /// Drain one finished build without blocking.
    pub fn poll_feedback(&mut self) -> Option<Result<BuildReport, ModelError>> {
        let feedback = self.feedback_rx.try_recv().ok()?;
        self.handle_feedback(feedback)
    }

    /// Block until the in-flight build finishes or `timeout` elapses.
    pub fn wait_for_build(&mut self, timeout: Duration) -> Option<Result<BuildReport, ModelError>> {
        let feedback = self.feedback_rx.recv_timeout(timeout).ok()?;
        self.handle_feedback(feedback)
    }

    /// Apply a finished build. Returns `None` for stale feedback.
    pub fn handle_feedback(&mut self, feedback: BuildFeedback) -> Option<Result<BuildReport, ModelError>> {
        let BuildFeedback {
            id,
            model,
            seed,
            config,
            result,
        } = feedback;
        self.model = Some(model);
        if id != self.build_id || self.state != GenerationState::Building {
            log::debug!(target: "generator", "dropping stale build {}", id);
            return None;
        }

        match result {
            Ok(population) => {
                let report = BuildReport {
                    seed,
                    density_axis: population.density_axis(),
                    sample_axis: population.sample_axis(),
                };
                self.population = Some(Arc::new(population));
                self.built_with = Some(config);
                self.state = GenerationState::Ready;
                log::info!(target: "generator", "Generator is ready.");
                Some(Ok(report))
            }
            Err(e) => {
                self.state = if self.population.is_some() {
                    GenerationState::Ready
                } else {
                    GenerationState::Idle
                };
                log::error!(target: "generator", "build failed: {}", e);
                Some(Err(e))
            }
        }
    }

    /// Copy of the candidate at `(density, sample)`.
    pub fn sample_candidate(&self, density: i32, sample: usize) -> Result<PatternTriple, SampleError> {
        let population = match (&self.population, self.state) {
            (Some(p), GenerationState::Ready) => p,
            _ => return Err(SampleError::NotReady),
        };
        usize::try_from(density)
            .ok()
            .and_then(|d| population.get(d, sample))
            .cloned()
            .ok_or(SampleError::NoSuchCandidate {
                density,
                sample,
                density_axis: population.density_axis(),
                sample_axis: population.sample_axis(),
            })
    }

    /// Length of the sample axis when ready.
    pub fn sample_axis(&self) -> Option<usize> {
        match self.state {
            GenerationState::Ready => self.population.as_ref().map(|p| p.sample_axis()),
            _ => None,
        }
    }

    /// Write the ready session under the state directory. No-op unless ready.
    pub fn save_session(&self, name: &str, source: &PatternTriple) -> Result<Option<PathBuf>, SessionError> {
        let (population, config) = match (self.state, &self.population, &self.built_with) {
            (GenerationState::Ready, Some(p), Some(c)) => (p, c),
            _ => {
                log::debug!(target: "generator", "save_session ignored in state {:?}", self.state);
                return Ok(None);
            }
        };
        let dir = self.state_dir.as_deref().ok_or(SessionError::NoStateDir)?;
        let path = session::session_path(dir, name)?;
        let doc = GeneratorSession {
            config: config.clone(),
            source: source.clone(),
            population: (**population).clone(),
        };
        session::write_session(&path, &doc)?;
        log::info!(target: "generator", "saved session to {}", path.display());
        Ok(Some(path))
    }

    /// Install a saved session. Relative paths resolve against the state
    /// directory. Returns the session's source pattern, or `None` while a
    /// build is in flight. A session for another pattern shape is rejected
    /// and the current population is kept.
    pub fn load_session(&mut self, path: &Path, expected: Shape) -> Result<Option<PatternTriple>, SessionError> {
        if self.state == GenerationState::Building {
            log::debug!(target: "generator", "load_session ignored: build in progress");
            return Ok(None);
        }
        let path = match &self.state_dir {
            Some(dir) if path.is_relative() && !path.exists() => dir.join(path),
            _ => path.to_path_buf(),
        };
        let doc = session::read_session(&path)?;
        if doc.source.shape() != expected {
            return Err(SessionError::ShapeMismatch {
                found: doc.source.shape(),
                expected,
            });
        }
        self.population = Some(Arc::new(doc.population));
        self.built_with = Some(doc.config);
        self.state = GenerationState::Ready;
        log::info!(target: "generator", "loaded session from {}", path.display());
        Ok(Some(doc.source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    const WAIT: Duration = Duration::from_secs(5);

    fn small_config() -> GeneratorConfig {
        GeneratorConfig {
            num_samples: 9,
            ..GeneratorConfig::default()
        }
    }

    fn orchestrator() -> GenerationOrchestrator {
        GenerationOrchestrator::new(Box::new(VariationModel::seeded(1)), None)
    }

    /// Model that blocks until released, then fails or succeeds.
    struct GatedModel {
        release: Receiver<bool>,
    }

    impl RhythmModel for GatedModel {
        fn build(
            &mut self,
            seed: &PatternTriple,
            config: &GeneratorConfig,
        ) -> Result<CandidatePopulation, ModelError> {
            match self.release.recv() {
                Ok(true) => VariationModel::seeded(0).build(seed, config),
                _ => Err(ModelError::Other("refused".into())),
            }
        }
    }

    #[test]
    fn build_becomes_ready() {
        let mut orch = orchestrator();
        let seed = Arc::new(PatternTriple::default());
        assert!(orch.generate(seed.clone(), small_config()));
        assert_eq!(orch.state(), GenerationState::Building);

        let report = orch.wait_for_build(WAIT).unwrap().unwrap();
        assert!(Arc::ptr_eq(&report.seed, &seed));
        assert_eq!(report.density_axis, 3);
        assert_eq!(orch.state(), GenerationState::Ready);
        assert_eq!(orch.sample_axis(), Some(3));
    }

    #[test]
    fn generate_while_building_is_ignored() {
        let (release_tx, release) = bounded(1);
        let mut orch = GenerationOrchestrator::new(Box::new(GatedModel { release }), None);
        let seed = Arc::new(PatternTriple::default());

        assert!(orch.generate(seed.clone(), small_config()));
        assert!(!orch.generate(seed, small_config()));
        assert_eq!(orch.sample_candidate(0, 0), Err(SampleError::NotReady));

        release_tx.send(true).unwrap();
        assert!(orch.wait_for_build(WAIT).unwrap().is_ok());
        // only one build was started
        assert!(orch.wait_for_build(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn failed_build_restores_previous_state() {
        let (release_tx, release) = bounded(2);
        let mut orch = GenerationOrchestrator::new(Box::new(GatedModel { release }), None);
        let seed = Arc::new(PatternTriple::default());

        orch.generate(seed.clone(), small_config());
        release_tx.send(false).unwrap();
        assert!(orch.wait_for_build(WAIT).unwrap().is_err());
        assert_eq!(orch.state(), GenerationState::Idle);

        orch.generate(seed.clone(), small_config());
        release_tx.send(true).unwrap();
        orch.wait_for_build(WAIT).unwrap().unwrap();

        orch.generate(seed, small_config());
        release_tx.send(false).unwrap();
        assert!(orch.wait_for_build(WAIT).unwrap().is_err());
        assert_eq!(orch.state(), GenerationState::Ready);
        assert!(orch.sample_candidate(0, 0).is_ok());
    }

    #[test]
    fn sample_rejects_bad_indices() {
        let mut orch = orchestrator();
        assert_eq!(orch.sample_candidate(0, 0), Err(SampleError::NotReady));

        orch.generate(Arc::new(PatternTriple::default()), small_config());
        orch.wait_for_build(WAIT).unwrap().unwrap();

        assert!(orch.sample_candidate(2, 2).is_ok());
        assert!(matches!(
            orch.sample_candidate(-1, 0),
            Err(SampleError::NoSuchCandidate { density: -1, .. })
        ));
        assert!(matches!(
            orch.sample_candidate(0, 3),
            Err(SampleError::NoSuchCandidate { .. })
        ));
    }

    #[test]
    fn session_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = GenerationOrchestrator::new(
            Box::new(VariationModel::seeded(4)),
            Some(dir.path().to_path_buf()),
        );
        let source = PatternTriple::default();

        // nothing to save before the first build
        assert!(orch.save_session("jam", &source).unwrap().is_none());

        orch.generate(Arc::new(source.clone()), small_config());
        orch.wait_for_build(WAIT).unwrap().unwrap();
        let path = orch.save_session("jam", &source).unwrap().unwrap();
        let expected = orch.sample_candidate(1, 1).unwrap();

        let mut fresh = GenerationOrchestrator::new(
            Box::new(VariationModel::seeded(9)),
            Some(dir.path().to_path_buf()),
        );
        let loaded_source = fresh.load_session(Path::new("jam.json"), Shape::default()).unwrap().unwrap();
        assert_eq!(loaded_source, source);
        assert!(fresh.is_ready());
        assert_eq!(fresh.sample_candidate(1, 1).unwrap(), expected);
        assert!(path.exists());
    }

    #[test]
    fn session_for_other_shape_keeps_population() {
        let dir = tempfile::tempdir().unwrap();
        let small = Shape::new(8, 9);
        let doc = GeneratorSession {
            config: small_config(),
            source: PatternTriple::empty(small),
            population: CandidatePopulation::new(1, 1, vec![PatternTriple::empty(small)]).unwrap(),
        };
        session::write_session(&dir.path().join("short.json"), &doc).unwrap();

        let mut orch = GenerationOrchestrator::new(
            Box::new(VariationModel::seeded(2)),
            Some(dir.path().to_path_buf()),
        );
        orch.generate(Arc::new(PatternTriple::default()), small_config());
        orch.wait_for_build(WAIT).unwrap().unwrap();

        let result = orch.load_session(Path::new("short.json"), Shape::default());
        assert!(matches!(
            result,
            Err(SessionError::ShapeMismatch { found, expected }) if found == small && expected == Shape::default()
        ));
        assert!(orch.is_ready());
        assert_eq!(orch.sample_axis(), Some(3));
        assert_eq!(orch.sample_candidate(2, 2).unwrap().shape(), Shape::default());
    }

    #[test]
    fn session_ops_are_noops_while_building() {
        let dir = tempfile::tempdir().unwrap();
        let (release_tx, release) = bounded(1);
        let mut orch = GenerationOrchestrator::new(
            Box::new(GatedModel { release }),
            Some(dir.path().to_path_buf()),
        );
        orch.generate(Arc::new(PatternTriple::default()), small_config());

        assert!(orch.save_session("x", &PatternTriple::default()).unwrap().is_none());
        assert!(orch.load_session(Path::new("x.json"), Shape::default()).unwrap().is_none());
        assert!(!dir.path().join("x.json").exists());

        release_tx.send(true).unwrap();
        orch.wait_for_build(WAIT).unwrap().unwrap();
    }
}
