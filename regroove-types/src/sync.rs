//! Transport sync modes and rates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the sync engine reacts to triggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Commit on loop boundaries, every `SyncRate` bars.
    #[default]
    Wait,
    /// Commit on every second sync trigger.
    Snap,
    /// Alternate between an auditioned candidate and the stashed pattern.
    Toggle,
}

impl SyncMode {
    pub const ALL: [SyncMode; 3] = [SyncMode::Wait, SyncMode::Snap, SyncMode::Toggle];

    /// Host-side numeric id (0, 1, 2).
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(SyncMode::Wait),
            1 => Some(SyncMode::Snap),
            2 => Some(SyncMode::Toggle),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            SyncMode::Wait => 0,
            SyncMode::Snap => 1,
            SyncMode::Toggle => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SyncMode::Wait => "wait",
            SyncMode::Snap => "snap",
            SyncMode::Toggle => "toggle",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wait" | "0" => Ok(SyncMode::Wait),
            "snap" | "1" => Ok(SyncMode::Snap),
            "toggle" | "2" => Ok(SyncMode::Toggle),
            other => Err(format!("unknown sync mode '{}'", other)),
        }
    }
}

/// Bars between commits in wait mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SyncRate {
    #[default]
    One,
    Two,
    Four,
}

impl SyncRate {
    pub const OPTIONS: [u32; 3] = [1, 2, 4];

    pub fn from_bars(bars: u32) -> Option<Self> {
        match bars {
            1 => Some(SyncRate::One),
            2 => Some(SyncRate::Two),
            4 => Some(SyncRate::Four),
            _ => None,
        }
    }

    pub fn bars(self) -> u32 {
        match self {
            SyncRate::One => 1,
            SyncRate::Two => 2,
            SyncRate::Four => 4,
        }
    }
}

impl TryFrom<u32> for SyncRate {
    type Error = String;

    fn try_from(bars: u32) -> Result<Self, Self::Error> {
        SyncRate::from_bars(bars)
            .ok_or_else(|| format!("sync rate {} must be one of {:?}", bars, SyncRate::OPTIONS))
    }
}

impl From<SyncRate> for u32 {
    fn from(rate: SyncRate) -> u32 {
        rate.bars()
    }
}

/// Observable phase of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Sync disabled.
    Idle,
    /// Enabled and waiting for the right trigger.
    Armed,
    /// A swap, history append and emit is in progress.
    Committing,
}
