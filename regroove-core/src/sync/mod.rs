//! Transport sync engine.
//!
//! Decides when the current pattern is replaced: on bar boundaries of the
//! host clock (wait), on alternate sync triggers (snap), or as a reversible
//! audition (toggle). Every pattern swap runs under the [`CommitGate`].

mod gate;


use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use regroove_types::{
    OutboundEvent, PatternTriple, Shape, ShapeError, SyncMode, SyncPhase, SyncRate,
};

use crate::archive::{ArchiveError, PatternArchive, ORIGIN};
use crate::generation::{
    BuildFeedback, BuildReport, GenerationOrchestrator, ModelError, SampleError,
};
use crate::marshal;
use crate::state::{ControlParams, EngineSettings, PatternHistory, PatternStore};

pub use gate::{CommitGate, CommitGuard};

#[derive(Debug, Error)]
pub enum CommitError {
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Everything a commit reads or writes.
pub struct EngineContext {
    pub store: PatternStore,
    pub history: PatternHistory,
    pub generator: GenerationOrchestrator,
    pub params: ControlParams,
    pub archive: Box<dyn PatternArchive>,
}

#[derive(Debug, Clone)]
pub struct SyncState {
    pub mode: SyncMode,
    pub enabled: bool,
    pub rate: SyncRate,
    /// Bar boundaries seen since the last wait-mode commit.
    pub bar_count: u32,
    /// Snap mode: whether the next trigger commits.
    pub snap_armed: bool,
    /// Toggle mode: whether a candidate is currently auditioned.
    pub auditioning: bool,
}

impl SyncState {
    fn new(mode: SyncMode, rate: SyncRate) -> Self {
        Self {
            mode,
            enabled: false,
            rate,
            bar_count: 0,
            snap_armed: true,
            auditioning: false,
        }
    }
}

pub struct SyncEngine {
    ctx: EngineContext,
    sync: SyncState,
    gate: CommitGate,
    /// Informational flag reported to the host with each emission.
    is_syncing: bool,
    rng: StdRng,
}

impl SyncEngine {
    pub fn new(
        settings: EngineSettings,
        generator: GenerationOrchestrator,
        archive: Box<dyn PatternArchive>,
    ) -> Self {
        let shape = Shape::new(
            settings.params.generator.loop_duration,
            settings.params.generator.channels,
        );
        Self {
            ctx: EngineContext {
                store: PatternStore::new(shape),
                history: PatternHistory::new(settings.history_capacity),
                generator,
                params: settings.params,
                archive,
            },
            sync: SyncState::new(settings.sync_mode, settings.sync_rate),
            gate: CommitGate::new(),
            is_syncing: false,
            rng: StdRng::from_entropy(),
        }
    }

    /// Make candidate selection deterministic.
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn store(&self) -> &PatternStore {
        &self.ctx.store
    }

    pub fn history(&self) -> &PatternHistory {
        &self.ctx.history
    }

    pub fn history_mut(&mut self) -> &mut PatternHistory {
        &mut self.ctx.history
    }

    pub fn generator(&self) -> &GenerationOrchestrator {
        &self.ctx.generator
    }

    pub fn generator_mut(&mut self) -> &mut GenerationOrchestrator {
        &mut self.ctx.generator
    }

    pub fn params(&self) -> &ControlParams {
        &self.ctx.params
    }

    pub fn params_mut(&mut self) -> &mut ControlParams {
        &mut self.ctx.params
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    pub fn gate(&self) -> &CommitGate {
        &self.gate
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing
    }

    pub fn phase(&self) -> SyncPhase {
        if self.gate.is_held() {
            SyncPhase::Committing
        } else if self.sync.enabled {
            SyncPhase::Armed
        } else {
            SyncPhase::Idle
        }
    }

    pub fn set_mode(&mut self, mode: SyncMode) {
        if self.sync.mode != mode {
            log::info!(target: "sync", "Set sync_mode to {}", mode);
            self.sync.mode = mode;
            self.sync.bar_count = 0;
            self.sync.snap_armed = true;
        }
    }

    pub fn set_rate(&mut self, rate: SyncRate) {
        log::info!(target: "sync", "Set sync_rate to {}", rate.bars());
        self.sync.rate = rate;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.sync.enabled = enabled;
        if !enabled {
            self.sync.bar_count = 0;
        }
    }

    /// Full display + playback update for the current pattern.
    pub fn emit_current(&self) -> Vec<OutboundEvent> {
        marshal::marshal(
            self.ctx.store.current(),
            &self.ctx.params.active_channels,
            self.ctx.params.ticks_per_step,
            self.is_syncing,
        )
    }

    // ---- triggers ----

    /// Host clock tick carrying the current step. Dropped whole, bar count
    /// included, while a commit holds the gate.
    pub fn on_tick(&mut self, step: i64) -> Vec<OutboundEvent> {
        if !self.sync.enabled || self.sync.mode != SyncMode::Wait {
            return Vec::new();
        }
        let loop_len = self.ctx.store.shape().steps.max(1) as i64;
        if step.rem_euclid(loop_len) != 0 {
            return Vec::new();
        }
        let Some(_guard) = self.gate.try_enter() else {
            log::debug!(target: "sync", "tick dropped: commit in progress");
            return Vec::new();
        };
        self.sync.bar_count += 1;
        if self.sync.bar_count < self.sync.rate.bars() {
            return Vec::new();
        }
        self.sync.bar_count = 0;
        self.commit_locked()
    }

    /// Sync trigger for snap and toggle modes. A trigger arriving while a
    /// commit holds the gate leaves the snap alternation untouched.
    pub fn on_sync_trigger(&mut self) -> Vec<OutboundEvent> {
        if !self.sync.enabled || self.sync.mode == SyncMode::Wait {
            return Vec::new();
        }
        let Some(_guard) = self.gate.try_enter() else {
            log::debug!(target: "sync", "sync trigger dropped: commit in progress");
            return Vec::new();
        };
        match self.sync.mode {
            SyncMode::Wait => Vec::new(),
            SyncMode::Snap => {
                let fire = self.sync.snap_armed;
                self.sync.snap_armed = !fire;
                if fire {
                    self.commit_locked()
                } else {
                    Vec::new()
                }
            }
            SyncMode::Toggle => self.toggle_locked(),
        }
    }

    /// Replace the current pattern with a random candidate at the current
    /// density, recording the outgoing one in history.
    pub fn commit(&mut self) -> Vec<OutboundEvent> {
        let Some(_guard) = self.gate.try_enter() else {
            log::debug!(target: "sync", "commit dropped: already committing");
            return Vec::new();
        };
        self.commit_locked()
    }

    /// Caller holds the gate.
    fn commit_locked(&mut self) -> Vec<OutboundEvent> {
        self.is_syncing = true;
        let events = match self.try_commit() {
            Ok(()) => self.emit_current(),
            Err(CommitError::Sample(SampleError::NotReady)) => {
                log::debug!(target: "sync", "Generator is not ready");
                Vec::new()
            }
            Err(e) => {
                log::warn!(target: "sync", "commit skipped: {}", e);
                Vec::new()
            }
        };
        self.is_syncing = false;
        events
    }

    fn try_commit(&mut self) -> Result<(), CommitError> {
        let candidate = Arc::new(self.random_candidate()?);
        self.ctx.store.check_shape(&candidate)?;
        self.ctx.archive.save(ORIGIN, &candidate)?;
        let previous = self.ctx.store.replace(candidate)?;
        self.ctx.history.append(previous);
        Ok(())
    }

    fn random_candidate(&mut self) -> Result<PatternTriple, SampleError> {
        let axis = self.ctx.generator.sample_axis().ok_or(SampleError::NotReady)?;
        let density = self.ctx.params.density_index;
        if axis == 0 {
            return Err(SampleError::NoSuchCandidate {
                density,
                sample: 0,
                density_axis: 0,
                sample_axis: 0,
            });
        }
        let sample = self.rng.gen_range(0..axis);
        log::debug!(target: "sync", "density index: {} random index: {}", density, sample);
        self.ctx.generator.sample_candidate(density, sample)
    }

    /// Caller holds the gate.
    fn toggle_locked(&mut self) -> Vec<OutboundEvent> {
        self.is_syncing = true;
        let events = if self.sync.auditioning {
            self.ctx.store.restore_stash();
            self.sync.auditioning = false;
            self.emit_current()
        } else {
            let installed = self
                .random_candidate()
                .map_err(CommitError::from)
                .and_then(|c| Ok(self.ctx.store.stash_and_replace(Arc::new(c))?));
            match installed {
                Ok(()) => {
                    self.sync.auditioning = true;
                    self.emit_current()
                }
                Err(e) => {
                    log::debug!(target: "sync", "audition skipped: {}", e);
                    Vec::new()
                }
            }
        };
        self.is_syncing = false;
        events
    }

    // ---- recalls ----

    /// Install `triple` as current under the gate and emit it. Never touches
    /// history.
    fn recall(&mut self, triple: Arc<PatternTriple>) -> Vec<OutboundEvent> {
        let Some(_guard) = self.gate.try_enter() else {
            log::debug!(target: "sync", "recall dropped: commit in progress");
            return Vec::new();
        };
        self.install(triple)
    }

    /// Caller holds the gate.
    fn install(&mut self, triple: Arc<PatternTriple>) -> Vec<OutboundEvent> {
        if let Err(e) = self.ctx.store.replace(triple) {
            log::warn!(target: "sync", "recall rejected: {}", e);
            return Vec::new();
        }
        self.is_syncing = true;
        let events = self.emit_current();
        self.is_syncing = false;
        events
    }

    /// Step one entry further back through history.
    pub fn recall_history(&mut self) -> Vec<OutboundEvent> {
        let Some(_guard) = self.gate.try_enter() else {
            log::debug!(target: "sync", "recall dropped: commit in progress");
            return Vec::new();
        };
        match self.ctx.history.step_back() {
            Some(entry) => {
                log::debug!(target: "sync", "Get pattern {}", self.ctx.history.cursor());
                self.install(entry)
            }
            None => {
                log::debug!(
                    target: "sync",
                    "Pattern history index {} > history length {}",
                    self.ctx.history.cursor(),
                    self.ctx.history.len()
                );
                Vec::new()
            }
        }
    }

    /// Reinstall the seed of the last generation.
    pub fn recall_source(&mut self) -> Vec<OutboundEvent> {
        match self.ctx.store.source().cloned() {
            Some(source) => self.recall(source),
            None => {
                log::debug!(target: "sync", "no source pattern yet");
                Vec::new()
            }
        }
    }

    pub fn load_pattern(&mut self, name: &str) -> Vec<OutboundEvent> {
        match self.ctx.archive.load(name) {
            Ok(triple) => self.recall(Arc::new(triple)),
            Err(e) => {
                log::warn!(target: "archive", "load_pattern {}: {}", name, e);
                Vec::new()
            }
        }
    }

    pub fn save_pattern(&mut self, name: &str) -> bool {
        let current = Arc::clone(self.ctx.store.current());
        match self.ctx.archive.save(name, &current) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(target: "archive", "save_pattern {}: {}", name, e);
                false
            }
        }
    }

    /// Install the archived "origin" pattern, if any. Used at startup.
    pub fn restore_origin(&mut self) -> Vec<OutboundEvent> {
        if !self.ctx.archive.contains(ORIGIN) {
            return Vec::new();
        }
        log::info!(target: "archive", "restoring origin pattern");
        self.load_pattern(ORIGIN)
    }

    // ---- editing ----

    /// Single-cell edit addressed by external channel. `value` must be 0 or 1.
    pub fn edit_cell(&mut self, step: i64, channel: i64, value: f32) -> bool {
        if value != 0.0 && value != 1.0 {
            log::debug!(target: "sync", "update_cell ignored: value {} not 0 or 1", value);
            return false;
        }
        let shape = self.ctx.store.shape();
        let (Ok(step), Ok(channel)) = (usize::try_from(step), usize::try_from(channel)) else {
            log::warn!("Invalid pattern index: [{}, {}]", step, channel);
            return false;
        };
        if !shape.contains(step, channel) {
            log::warn!("Invalid pattern index: [{}, {}]", step, channel);
            return false;
        }
        let internal = self.ctx.params.active_channels.internal_index(channel);
        let scale = self.ctx.params.velocity_scale;
        self.ctx.store.set_cell(step, internal, value, scale)
    }

    // ---- generation ----

    /// Start a build seeded with the current pattern.
    pub fn generate(&mut self) -> bool {
        let seed = Arc::clone(self.ctx.store.current());
        let config = self.ctx.params.generator.clone();
        self.ctx.generator.generate(seed, config)
    }

    /// Apply a finished build received from the orchestrator's channel.
    pub fn handle_generation_feedback(&mut self, feedback: BuildFeedback) -> Vec<OutboundEvent> {
        match self.ctx.generator.handle_feedback(feedback) {
            Some(result) => self.apply_build(result),
            None => Vec::new(),
        }
    }

    /// Drain finished builds without blocking.
    pub fn poll_generation(&mut self) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.ctx.generator.poll_feedback() {
            events.extend(self.apply_build(result));
        }
        events
    }

    /// Block until the in-flight build lands or `timeout` elapses.
    pub fn wait_for_generation(&mut self, timeout: Duration) -> Vec<OutboundEvent> {
        match self.ctx.generator.wait_for_build(timeout) {
            Some(result) => self.apply_build(result),
            None => Vec::new(),
        }
    }

    fn apply_build(&mut self, result: Result<BuildReport, ModelError>) -> Vec<OutboundEvent> {
        match result {
            Ok(report) => {
                if let Err(e) = self.ctx.store.set_source(report.seed) {
                    log::warn!(target: "generator", "source rejected: {}", e);
                }
                vec![OutboundEvent::GeneratorReady {
                    density_axis: report.density_axis,
                    sample_axis: report.sample_axis,
                }]
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn save_session(&mut self, name: &str) {
        let source = self
            .ctx
            .store
            .source()
            .cloned()
            .unwrap_or_else(|| Arc::clone(self.ctx.store.current()));
        if let Err(e) = self.ctx.generator.save_session(name, &source) {
            log::warn!(target: "generator", "save_generator_state {}: {}", name, e);
        }
    }

    pub fn load_session(&mut self, path: &Path) -> Vec<OutboundEvent> {
        let shape = self.ctx.store.shape();
        match self.ctx.generator.load_session(path, shape) {
            Ok(Some(source)) => {
                if let Err(e) = self.ctx.store.set_source(Arc::new(source)) {
                    log::warn!(target: "generator", "session source rejected: {}", e);
                }
                match self.ctx.generator.population() {
                    Some(p) => vec![OutboundEvent::GeneratorReady {
                        density_axis: p.density_axis(),
                        sample_axis: p.sample_axis(),
                    }],
                    None => Vec::new(),
                }
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!(target: "generator", "load_generator_state {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }
}
