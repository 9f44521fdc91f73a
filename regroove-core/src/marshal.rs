//! Converts the current pattern into the two host encodings: the display
//! grid (external channel order, active channels only) and the playback
//! event list (internal channel order, absolute ticks).

use regroove_types::{ChannelMask, DisplayGrid, GridCell, OutboundEvent, PatternTriple, PlaybackEvent};

/// Round to 3 decimals, the precision the host works with.
fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

pub fn display_grid(triple: &PatternTriple, mask: &ChannelMask) -> DisplayGrid {
    let shape = triple.shape();
    let mut grid = DisplayGrid::default();
    for external in (0..shape.channels).rev() {
        if !mask.is_active(external) {
            continue;
        }
        let internal = mask.internal_index(external);
        for step in 0..shape.steps {
            let Some(cell) = triple.cell(step, internal) else {
                continue;
            };
            let velocity = if cell.onset == 1.0 { round3(cell.velocity) } else { 0.0 };
            grid.onsets.push(GridCell {
                step: step as u32,
                channel: external as u32,
                value: cell.onset,
            });
            grid.velocities.push(GridCell {
                step: step as u32,
                channel: external as u32,
                value: velocity,
            });
        }
    }
    grid
}

/// One event per onset of an active channel at `step * T + offset * T / 2`,
/// in the same channel-then-step order as the display grid.
pub fn playback_events(triple: &PatternTriple, mask: &ChannelMask, ticks_per_step: i64) -> Vec<PlaybackEvent> {
    let shape = triple.shape();
    let half = ticks_per_step as f32 / 2.0;
    let mut events = Vec::new();
    for external in (0..shape.channels).rev() {
        if !mask.is_active(external) {
            continue;
        }
        let internal = mask.internal_index(external);
        for step in 0..shape.steps {
            let Some(cell) = triple.cell(step, internal) else {
                continue;
            };
            if cell.onset != 1.0 {
                continue;
            }
            events.push(PlaybackEvent {
                tick: step as i64 * ticks_per_step + (cell.offset * half).round() as i64,
                channel: internal as u32,
                velocity: round3(cell.velocity),
            });
        }
    }
    events
}

/// Full update for the host, in emission order.
pub fn marshal(
    triple: &PatternTriple,
    mask: &ChannelMask,
    ticks_per_step: i64,
    is_syncing: bool,
) -> Vec<OutboundEvent> {
    let grid = display_grid(triple, mask);
    vec![
        OutboundEvent::FillOnsets(grid.onsets),
        OutboundEvent::FillVelocities(grid.velocities),
        OutboundEvent::EventSequence(playback_events(triple, mask, ticks_per_step)),
        OutboundEvent::SyncState(is_syncing),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use regroove_types::{Cell, CHANNELS, LOOP_DURATION};

    fn hit(triple: PatternTriple, step: usize, channel: usize, velocity: f32, offset: f32) -> PatternTriple {
        triple
            .with_cell(step, channel, Cell { onset: 1.0, velocity, offset })
            .unwrap()
    }

    #[test]
    fn display_grid_covers_active_channels_descending() {
        let mask = ChannelMask::parse("110000001", CHANNELS).unwrap();
        let grid = display_grid(&PatternTriple::default(), &mask);
        assert_eq!(grid.onsets.len(), 3 * LOOP_DURATION);
        assert_eq!(grid.velocities.len(), grid.onsets.len());

        let channels: Vec<u32> = grid.onsets.iter().step_by(LOOP_DURATION).map(|c| c.channel).collect();
        assert_eq!(channels, vec![8, 1, 0]);
        assert_eq!(grid.onsets[0].step, 0);
        assert_eq!(grid.onsets[LOOP_DURATION - 1].step, (LOOP_DURATION - 1) as u32);
    }

    #[test]
    fn display_grid_mirrors_channels_and_rounds() {
        // internal 0 is external 8
        let triple = hit(PatternTriple::default(), 4, 0, 0.123456, 0.0);
        let grid = display_grid(&triple, &ChannelMask::all(CHANNELS));

        let onset = grid.onsets.iter().find(|c| c.step == 4 && c.channel == 8).unwrap();
        assert_eq!(onset.value, 1.0);
        let velocity = grid.velocities.iter().find(|c| c.step == 4 && c.channel == 8).unwrap();
        assert!((velocity.value - 0.123).abs() < 1e-6);
    }

    #[test]
    fn silent_cells_report_zero_velocity() {
        let triple = PatternTriple::default()
            .with_cell(1, 1, Cell { onset: 0.0, velocity: 0.9, offset: 0.0 })
            .unwrap();
        let grid = display_grid(&triple, &ChannelMask::all(CHANNELS));
        assert!(grid.velocities.iter().all(|c| c.value == 0.0));
    }

    #[test]
    fn playback_ticks_include_offsets() {
        let mut triple = hit(PatternTriple::default(), 0, 2, 0.8, 0.0);
        triple = hit(triple, 3, 5, 0.6, 0.5);
        triple = hit(triple, 7, 1, 0.4, -1.0);

        let events = playback_events(&triple, &ChannelMask::all(CHANNELS), 32);
        assert_eq!(
            events,
            vec![
                PlaybackEvent { tick: 7 * 32 - 16, channel: 1, velocity: 0.4 },
                PlaybackEvent { tick: 0, channel: 2, velocity: 0.8 },
                PlaybackEvent { tick: 3 * 32 + 8, channel: 5, velocity: 0.6 },
            ]
        );
    }

    #[test]
    fn playback_walks_channels_before_steps() {
        let mut triple = hit(PatternTriple::default(), 0, 2, 1.0, 0.0);
        triple = hit(triple, 7, 1, 1.0, 0.0);
        triple = hit(triple, 2, 1, 1.0, 0.0);

        let order: Vec<(i64, u32)> = playback_events(&triple, &ChannelMask::all(CHANNELS), 32)
            .iter()
            .map(|e| (e.tick, e.channel))
            .collect();
        assert_eq!(order, vec![(64, 1), (224, 1), (0, 2)]);
    }

    #[test]
    fn playback_skips_inactive_channels() {
        let triple = hit(hit(PatternTriple::default(), 0, 0, 1.0, 0.0), 0, 8, 1.0, 0.0);
        // only external 0 (internal 8) active
        let mask = ChannelMask::parse("100000000", CHANNELS).unwrap();
        let events = playback_events(&triple, &mask, 32);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel, 8);
    }

    #[test]
    fn marshal_emits_in_order() {
        let events = marshal(&PatternTriple::default(), &ChannelMask::all(CHANNELS), 32, true);
        assert!(matches!(events[0], OutboundEvent::FillOnsets(_)));
        assert!(matches!(events[1], OutboundEvent::FillVelocities(_)));
        assert!(matches!(events[2], OutboundEvent::EventSequence(ref e) if e.is_empty()));
        assert_eq!(events[3], OutboundEvent::SyncState(true));
    }
}
