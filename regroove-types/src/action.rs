//! Control actions received from the host.
//!
//! Values are carried as received; range validation happens in dispatch so
//! that invalid input can be logged and ignored in one place.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlAction {
    /// 0..=1, higher means denser candidates.
    Density(f32),
    /// 0..=1, sets the upper onset threshold.
    MinDensity(f32),
    /// 0..=1, sets the lower onset threshold.
    MaxDensity(f32),
    /// 0..=1, note dropout becomes `1 - v`.
    Random(f32),
    /// 0..=1000 candidates per build.
    Samples(i64),
    /// 0 = wait, 1 = snap, 2 = toggle.
    SyncMode(i64),
    /// Bars per commit: 1, 2 or 4.
    SyncRate(f32),
    /// 0..=127.
    Velocity(f32),
    /// 0 or 1.
    SyncOn(i64),
    Generate,
    /// (step, external channel, onset value)
    UpdateCell { step: i64, channel: i64, value: f32 },
    /// Transport clock tick carrying the current step.
    WaitSync(i64),
    /// Beat / user sync trigger for snap and toggle modes.
    SyncTrigger,
    SetActiveChannels(String),
    SavePattern(String),
    LoadPattern(String),
    SaveGeneratorState(String),
    LoadGeneratorState(PathBuf),
    GetCachedPattern,
    GetSourcePattern,
    ClearPatternHistory,
    /// 1 enables debug logging, 0 disables it.
    Debug(i64),
}

impl ControlAction {
    /// Actions that must not run while a commit is in progress. These are
    /// dropped at ingress instead of being queued behind the commit.
    pub fn is_gated(&self) -> bool {
        matches!(
            self,
            ControlAction::WaitSync(_)
                | ControlAction::SyncTrigger
                | ControlAction::GetCachedPattern
                | ControlAction::GetSourcePattern
                | ControlAction::LoadPattern(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlAction::Density(_) => "density",
            ControlAction::MinDensity(_) => "minDensity",
            ControlAction::MaxDensity(_) => "maxDensity",
            ControlAction::Random(_) => "random",
            ControlAction::Samples(_) => "samples",
            ControlAction::SyncMode(_) => "syncMode",
            ControlAction::SyncRate(_) => "syncRate",
            ControlAction::Velocity(_) => "velocity",
            ControlAction::SyncOn(_) => "syncOn",
            ControlAction::Generate => "generate",
            ControlAction::UpdateCell { .. } => "update_cell",
            ControlAction::WaitSync(_) => "wait_sync",
            ControlAction::SyncTrigger => "sync",
            ControlAction::SetActiveChannels(_) => "set_active_channels",
            ControlAction::SavePattern(_) => "save_pattern",
            ControlAction::LoadPattern(_) => "load_pattern",
            ControlAction::SaveGeneratorState(_) => "save_generator_state",
            ControlAction::LoadGeneratorState(_) => "load_generator_state",
            ControlAction::GetCachedPattern => "get_cached_pattern",
            ControlAction::GetSourcePattern => "get_source_pattern",
            ControlAction::ClearPatternHistory => "clear_pattern_history",
            ControlAction::Debug(_) => "debug",
        }
    }
}
