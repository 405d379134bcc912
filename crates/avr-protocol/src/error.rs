//! Protocol-level errors.
//!
//! None of these are fatal to a session: the dispatcher logs them and
//! keeps reading.

use avr_core::DomainError;
use thiserror::Error;

/// Errors raised while parsing frames or building commands.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// The frame is too short to carry a two-character command code.
    #[error("Malformed frame {frame:?}: {reason}")]
    MalformedFrame { frame: String, reason: String },

    /// A command cannot be written as a single frame.
    #[error("Invalid command {command:?}: {reason}")]
    InvalidCommand { command: String, reason: String },

    /// The frame parsed but its parameter did not decode.
    #[error("Failed to decode frame: {0}")]
    Decode(#[from] DomainError),
}
