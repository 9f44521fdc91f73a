use std::path::{Path, PathBuf};

use serde::Deserialize;

use regroove_types::{ChannelMask, GeneratorConfig, SyncMode, SyncRate, CHANNELS, LOOP_DURATION};

use crate::state::{ControlParams, EngineSettings};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    runtime: RuntimeConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    samples: Option<u32>,
    min_onset_threshold: Option<f32>,
    max_onset_threshold: Option<f32>,
    onset_threshold_floor: Option<f32>,
    onset_threshold_ceiling: Option<f32>,
    note_dropout: Option<f32>,
    velocity: Option<u8>,
    sync_mode: Option<String>,
    sync_rate: Option<u32>,
    active_channels: Option<String>,
}

#[derive(Deserialize, Default)]
struct RuntimeConfig {
    listen_addr: Option<String>,
    host_addr: Option<String>,
    ticks_per_step: Option<i64>,
    history_capacity: Option<usize>,
    data_dir: Option<PathBuf>,
}

pub struct Config {
    defaults: DefaultsConfig,
    runtime: RuntimeConfig,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if any.
    pub fn load() -> Self {
        Self::load_from(user_config_path().as_deref())
    }

    pub fn load_from(user_path: Option<&Path>) -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = user_path {
            if path.exists() {
                match std::fs::read_to_string(path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_defaults(&mut base.defaults, user.defaults);
                            merge_runtime(&mut base.runtime, user.runtime);
                        }
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            defaults: base.defaults,
            runtime: base.runtime,
        }
    }

    /// Initial engine parameters.
    pub fn engine_settings(&self) -> EngineSettings {
        let fallback = GeneratorConfig::default();
        let generator = GeneratorConfig {
            min_onset_threshold: self
                .defaults
                .min_onset_threshold
                .unwrap_or(fallback.min_onset_threshold),
            max_onset_threshold: self
                .defaults
                .max_onset_threshold
                .unwrap_or(fallback.max_onset_threshold),
            num_samples: self.defaults.samples.unwrap_or(fallback.num_samples).min(1000),
            note_dropout: self
                .defaults
                .note_dropout
                .unwrap_or(fallback.note_dropout)
                .clamp(0.0, 1.0),
            channels: CHANNELS,
            loop_duration: LOOP_DURATION,
        };

        let active_channels = self
            .defaults
            .active_channels
            .as_deref()
            .and_then(|m| match ChannelMask::parse(m, CHANNELS) {
                Ok(mask) => Some(mask),
                Err(e) => {
                    log::warn!(target: "config", "ignoring active_channels: {}", e);
                    None
                }
            })
            .unwrap_or_else(|| ChannelMask::all(CHANNELS));

        let velocity = self.defaults.velocity.unwrap_or(100).min(127);

        EngineSettings {
            params: ControlParams {
                density_index: 0,
                velocity_scale: velocity as f32 / 127.0,
                generator,
                active_channels,
                ticks_per_step: self.ticks_per_step(),
                onset_threshold_floor: self.defaults.onset_threshold_floor.unwrap_or(0.3),
                onset_threshold_ceiling: self.defaults.onset_threshold_ceiling.unwrap_or(0.7),
            },
            sync_mode: self
                .defaults
                .sync_mode
                .as_deref()
                .and_then(|s| s.parse::<SyncMode>().ok())
                .unwrap_or_default(),
            sync_rate: self
                .defaults
                .sync_rate
                .and_then(SyncRate::from_bars)
                .unwrap_or_default(),
            history_capacity: self.history_capacity(),
        }
    }

    pub fn listen_addr(&self) -> String {
        self.runtime
            .listen_addr
            .clone()
            .unwrap_or_else(|| "127.0.0.1:7400".to_string())
    }

    pub fn host_addr(&self) -> String {
        self.runtime
            .host_addr
            .clone()
            .unwrap_or_else(|| "127.0.0.1:7401".to_string())
    }

    /// Ticks per step (clamped to 2..=960 and rounded down to an even number,
    /// so half-step offsets land on whole ticks).
    pub fn ticks_per_step(&self) -> i64 {
        let t = self.runtime.ticks_per_step.unwrap_or(32).clamp(2, 960);
        t - t % 2
    }

    /// History capacity (clamped to 1..=10000).
    pub fn history_capacity(&self) -> usize {
        self.runtime.history_capacity.unwrap_or(100).clamp(1, 10_000)
    }

    /// Explicit data directory from the config file, if set.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.runtime.data_dir.clone()
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("regroove").join("config.toml"))
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.samples.is_some() {
        base.samples = user.samples;
    }
    if user.min_onset_threshold.is_some() {
        base.min_onset_threshold = user.min_onset_threshold;
    }
    if user.max_onset_threshold.is_some() {
        base.max_onset_threshold = user.max_onset_threshold;
    }
    if user.onset_threshold_floor.is_some() {
        base.onset_threshold_floor = user.onset_threshold_floor;
    }
    if user.onset_threshold_ceiling.is_some() {
        base.onset_threshold_ceiling = user.onset_threshold_ceiling;
    }
    if user.note_dropout.is_some() {
        base.note_dropout = user.note_dropout;
    }
    if user.velocity.is_some() {
        base.velocity = user.velocity;
    }
    if user.sync_mode.is_some() {
        base.sync_mode = user.sync_mode;
    }
    if user.sync_rate.is_some() {
        base.sync_rate = user.sync_rate;
    }
    if user.active_channels.is_some() {
        base.active_channels = user.active_channels;
    }
}

fn merge_runtime(base: &mut RuntimeConfig, user: RuntimeConfig) {
    if user.listen_addr.is_some() {
        base.listen_addr = user.listen_addr;
    }
    if user.host_addr.is_some() {
        base.host_addr = user.host_addr;
    }
    if user.ticks_per_step.is_some() {
        base.ticks_per_step = user.ticks_per_step;
    }
    if user.history_capacity.is_some() {
        base.history_capacity = user.history_capacity;
    }
    if user.data_dir.is_some() {
        base.data_dir = user.data_dir;
    }
}
