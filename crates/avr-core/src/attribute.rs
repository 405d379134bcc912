//! Receiver attributes and their decoded values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known attribute names written by the protocol decoder.
///
/// Names match the keys observers register change handlers for.
pub mod names {
    /// Overall power state (`ON` / `STANDBY`).
    pub const POWER: &str = "POWER";

    /// Main zone power state (`ON` / `OFF`).
    pub const MAIN_ZONE_POWER: &str = "MainZonePower";

    /// Main zone volume in dB relative to the reference level.
    pub const MAIN_ZONE_VOLUME: &str = "MainZoneVolume";

    /// Main zone mute state, lower-cased (`on` / `off`).
    pub const MAIN_ZONE_MUTE: &str = "MainZoneMute";

    /// Selected main zone input source.
    pub const MAIN_ZONE_INPUT: &str = "MainZoneInputFuncSelect";

    /// Active surround mode.
    pub const MAIN_ZONE_SURROUND_MODE: &str = "MainZoneSurroundMode";

    /// Every attribute the decoder can produce.
    pub const ALL: [&str; 6] = [
        POWER,
        MAIN_ZONE_POWER,
        MAIN_ZONE_VOLUME,
        MAIN_ZONE_MUTE,
        MAIN_ZONE_INPUT,
        MAIN_ZONE_SURROUND_MODE,
    ];
}

/// Last decoded value of a receiver attribute.
///
/// The decode table only ever produces these three shapes, so the
/// store keeps a closed variant instead of an open "any" value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Numeric value (volume in dB).
    Number(f64),

    /// Raw or normalized protocol text.
    Text(String),

    /// Boolean flag.
    Bool(bool),
}

impl AttributeValue {
    /// Returns the numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text value, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a flag.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for AttributeValue {
    /// Numbers render with one decimal place, matching the device's own
    /// volume resolution.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n:.1}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}
