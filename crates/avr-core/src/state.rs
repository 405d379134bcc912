//! Coarse connection status, kept separate from attribute values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of a receiver session.
///
/// Lets observers tell "attribute never reported" apart from
/// "session currently down".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport open.
    #[default]
    Disconnected,

    /// Dialing the receiver.
    Connecting,

    /// Transport open and usable for commands.
    Connected,

    /// The last session ended with an error (connect failure or lost connection).
    Error,
}

impl ConnectionState {
    /// Returns true if commands can currently be written.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
