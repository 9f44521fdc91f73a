use regroove_types::{ChannelMask, GeneratorConfig, SyncMode, SyncRate};

/// Parameters set from the host's control surface.
#[derive(Debug, Clone)]
pub struct ControlParams {
    /// Row of the candidate population to sample from. May be negative after
    /// a density of 1.0; sampling then fails and the commit is skipped.
    pub density_index: i32,
    /// Velocity written by single-cell edits, 0..=1.
    pub velocity_scale: f32,
    pub generator: GeneratorConfig,
    pub active_channels: ChannelMask,
    pub ticks_per_step: i64,
    /// Bounds of the onset-threshold range the density sliders map onto.
    pub onset_threshold_floor: f32,
    pub onset_threshold_ceiling: f32,
}

impl ControlParams {
    /// `round((1 - v) * sqrt(samples)) - 1`
    pub fn density_index_for(&self, value: f32) -> i32 {
        let axis = (self.generator.num_samples as f32).sqrt();
        ((1.0 - value) * axis).round() as i32 - 1
    }

    /// Map a 0..=1 slider onto the onset-threshold range.
    pub fn normalize_threshold(&self, value: f32) -> f32 {
        (self.onset_threshold_ceiling - self.onset_threshold_floor) * value
            + self.onset_threshold_floor
    }
}

impl Default for ControlParams {
    fn default() -> Self {
        let generator = GeneratorConfig::default();
        Self {
            density_index: 0,
            velocity_scale: 100.0 / 127.0,
            active_channels: ChannelMask::all(generator.channels),
            generator,
            ticks_per_step: 32,
            onset_threshold_floor: 0.3,
            onset_threshold_ceiling: 0.7,
        }
    }
}

/// Everything needed to construct a sync engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub params: ControlParams,
    pub sync_mode: SyncMode,
    pub sync_rate: SyncRate,
    pub history_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            params: ControlParams::default(),
            sync_mode: SyncMode::default(),
            sync_rate: SyncRate::default(),
            history_capacity: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_index_follows_sample_count() {
        let params = ControlParams::default();
        // 400 samples -> 20 rows
        assert_eq!(params.density_index_for(0.0), 19);
        assert_eq!(params.density_index_for(0.5), 9);
        assert_eq!(params.density_index_for(1.0), -1);
    }

    #[test]
    fn threshold_normalizes_into_range() {
        let params = ControlParams::default();
        assert!((params.normalize_threshold(0.0) - 0.3).abs() < 1e-6);
        assert!((params.normalize_threshold(1.0) - 0.7).abs() < 1e-6);
        assert!((params.normalize_threshold(0.5) - 0.5).abs() < 1e-6);
    }
}
