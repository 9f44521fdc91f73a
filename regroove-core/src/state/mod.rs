pub mod history;
pub mod params;
pub mod pattern_store;

pub use history::PatternHistory;
pub use params::{ControlParams, EngineSettings};
pub use pattern_store::PatternStore;
