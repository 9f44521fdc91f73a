//! # regroove-types
//!
//! Shared type definitions for the regroove workspace: the pattern triple,
//! sync enums, channel masks, control actions and outbound events. Used by
//! regroove-core and regroove-osc.

pub mod action;
pub mod channel;
pub mod event;
pub mod generation;
pub mod pattern;
pub mod sync;

pub use action::ControlAction;
pub use channel::{ChannelMask, MaskError};
pub use event::{DisplayGrid, GridCell, OutboundEvent, PlaybackEvent};
pub use generation::{GenerationState, GeneratorConfig};
pub use pattern::{Cell, Grid, PatternTriple, Shape, ShapeError, CHANNELS, LOOP_DURATION};
pub use sync::{SyncMode, SyncPhase, SyncRate};
