//! Channel activation mask.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    #[error("channel mask '{mask}' must have {expected} characters")]
    Length { mask: String, expected: usize },
    #[error("channel mask '{0}' may only contain '0' and '1'")]
    Character(String),
}

/// Which channels are shown and played, indexed by external (display) channel.
///
/// The host addresses channels in reverse order; the internal grid index of
/// external channel `e` is `channels - e - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMask {
    active: Vec<bool>,
}

impl ChannelMask {
    pub fn all(channels: usize) -> Self {
        Self {
            active: vec![true; channels],
        }
    }

    /// Parse a bitmask string such as `"111011111"`.
    ///
    /// Hosts that prefix the mask with a marker character (to stop it being
    /// read as a number) send `channels + 1` characters; the first is dropped.
    pub fn parse(mask: &str, channels: usize) -> Result<Self, MaskError> {
        let chars: Vec<char> = mask.chars().collect();
        let bits = match chars.len() {
            n if n == channels => &chars[..],
            n if n == channels + 1 => &chars[1..],
            _ => {
                return Err(MaskError::Length {
                    mask: mask.to_string(),
                    expected: channels,
                })
            }
        };
        let active = bits
            .iter()
            .map(|c| match c {
                '1' => Ok(true),
                '0' => Ok(false),
                _ => Err(MaskError::Character(mask.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { active })
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_active(&self, external: usize) -> bool {
        self.active.get(external).copied().unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    /// Internal grid index for an external channel.
    pub fn internal_index(&self, external: usize) -> usize {
        self.active.len() - external - 1
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &a in &self.active {
            f.write_str(if a { "1" } else { "0" })?;
        }
        Ok(())
    }
}
