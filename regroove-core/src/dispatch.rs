//! Applies host control actions to the sync engine.
//!
//! Every parameter is range-checked here; out-of-range input is logged and
//! leaves the engine unchanged.

use regroove_types::{ChannelMask, ControlAction, OutboundEvent, SyncMode, SyncRate};

use crate::sync::SyncEngine;

/// What a dispatched action produced.
#[derive(Debug, Default, PartialEq)]
pub struct DispatchResult {
    /// Events to forward to the host, in order.
    pub events: Vec<OutboundEvent>,
    /// Why the action was ignored, if it was.
    pub rejected: Option<String>,
}

impl DispatchResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<OutboundEvent>) -> Self {
        Self {
            events,
            rejected: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::warn!(target: "dispatch", "{}", reason);
        Self {
            events: Vec::new(),
            rejected: Some(reason),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected.is_some()
    }
}

fn unit_range(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

pub fn dispatch_action(action: &ControlAction, engine: &mut SyncEngine) -> DispatchResult {
    log::debug!(target: "dispatch", "{:?}", action);
    match action {
        ControlAction::Density(v) => {
            if !unit_range(*v) {
                return DispatchResult::rejected(format!(
                    "invalid density value {} - must be between 0 and 1",
                    v
                ));
            }
            let params = engine.params_mut();
            params.density_index = params.density_index_for(*v);
            log::debug!(target: "dispatch", "density index {}", params.density_index);
            DispatchResult::none()
        }
        ControlAction::MinDensity(v) => {
            if !unit_range(*v) {
                return DispatchResult::rejected(format!(
                    "invalid maxOnsetThreshold value {} - must be between 0 and 1",
                    v
                ));
            }
            let params = engine.params_mut();
            params.generator.max_onset_threshold = params.normalize_threshold(1.0 - v);
            DispatchResult::none()
        }
        ControlAction::MaxDensity(v) => {
            if !unit_range(*v) {
                return DispatchResult::rejected(format!(
                    "invalid minOnsetThreshold value {} - must be between 0 and 1",
                    v
                ));
            }
            let params = engine.params_mut();
            params.generator.min_onset_threshold = params.normalize_threshold(1.0 - v);
            DispatchResult::none()
        }
        ControlAction::Random(v) => {
            if !unit_range(*v) {
                return DispatchResult::rejected(format!(
                    "invalid noteDropout value {} - must be between 0 and 1",
                    v
                ));
            }
            engine.params_mut().generator.note_dropout = 1.0 - v;
            DispatchResult::none()
        }
        ControlAction::Samples(n) => match u32::try_from(*n) {
            Ok(n) if n <= 1000 => {
                engine.params_mut().generator.num_samples = n;
                DispatchResult::none()
            }
            _ => DispatchResult::rejected(format!(
                "invalid numSamples value {} - must be between 0 and 1000",
                n
            )),
        },
        ControlAction::SyncMode(id) => match SyncMode::from_id(*id) {
            Some(mode) => {
                engine.set_mode(mode);
                DispatchResult::none()
            }
            None => DispatchResult::rejected(format!(
                "invalid syncMode id: {} - must be one of 0, 1, 2",
                id
            )),
        },
        ControlAction::SyncRate(v) => {
            let rate = if v.fract() == 0.0 && *v >= 0.0 {
                SyncRate::from_bars(*v as u32)
            } else {
                None
            };
            match rate {
                Some(rate) => {
                    engine.set_rate(rate);
                    DispatchResult::none()
                }
                None => DispatchResult::rejected(format!(
                    "invalid syncRate {} - must be one of {:?}",
                    v,
                    SyncRate::OPTIONS
                )),
            }
        }
        ControlAction::Velocity(v) => {
            if !(0.0..=127.0).contains(v) {
                return DispatchResult::rejected(format!(
                    "invalid velocity value {} - must be between 0 and 127",
                    v
                ));
            }
            engine.params_mut().velocity_scale = v / 127.0;
            DispatchResult::none()
        }
        ControlAction::SyncOn(flag) => match flag {
            0 | 1 => {
                engine.set_enabled(*flag == 1);
                DispatchResult::none()
            }
            _ => DispatchResult::rejected(format!("invalid syncOn value {} - must be 0 or 1", flag)),
        },
        ControlAction::Generate => {
            engine.generate();
            DispatchResult::none()
        }
        ControlAction::UpdateCell {
            step,
            channel,
            value,
        } => {
            if engine.edit_cell(*step, *channel, *value) {
                DispatchResult::none()
            } else {
                DispatchResult {
                    events: Vec::new(),
                    rejected: Some(format!("Invalid pattern index: [{}, {}]", step, channel)),
                }
            }
        }
        ControlAction::WaitSync(step) => DispatchResult::with_events(engine.on_tick(*step)),
        ControlAction::SyncTrigger => DispatchResult::with_events(engine.on_sync_trigger()),
        ControlAction::SetActiveChannels(mask) => {
            let channels = engine.store().shape().channels;
            match ChannelMask::parse(mask, channels) {
                Ok(mask) => {
                    log::debug!(target: "dispatch", "active channels {}", mask);
                    engine.params_mut().active_channels = mask;
                    DispatchResult::none()
                }
                Err(e) => DispatchResult::rejected(e.to_string()),
            }
        }
        ControlAction::SavePattern(name) => {
            engine.save_pattern(name);
            DispatchResult::none()
        }
        ControlAction::LoadPattern(name) => DispatchResult::with_events(engine.load_pattern(name)),
        ControlAction::SaveGeneratorState(name) => {
            engine.save_session(name);
            DispatchResult::none()
        }
        ControlAction::LoadGeneratorState(path) => {
            DispatchResult::with_events(engine.load_session(path))
        }
        ControlAction::GetCachedPattern => DispatchResult::with_events(engine.recall_history()),
        ControlAction::GetSourcePattern => DispatchResult::with_events(engine.recall_source()),
        ControlAction::ClearPatternHistory => {
            engine.history_mut().clear();
            DispatchResult::none()
        }
        ControlAction::Debug(flag) => match flag {
            1 => {
                log::set_max_level(log::LevelFilter::Debug);
                log::info!("Debug ON");
                DispatchResult::none()
            }
            0 => {
                log::info!("Debug OFF");
                log::set_max_level(log::LevelFilter::Info);
                DispatchResult::none()
            }
            _ => DispatchResult::rejected(format!("invalid debug value {} - must be 0 or 1", flag)),
        },
    }
}
