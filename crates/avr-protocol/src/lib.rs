//! AVR Protocol - Telnet line protocol for receiver control
//!
//! This crate provides framing, event parsing and the decode table for
//! the receiver's status lines, and builders for the commands sent back.
//!
//! ```text
//!   "MV105\r"  ──parse──▶  ProtocolEvent { code: "MV", parameter: "105" }
//!                               │
//!                             decode
//!                               ▼
//!              Decoded::Update { MainZoneVolume = -69.5 }
//! ```

pub mod command;
pub mod decode;
pub mod error;
pub mod frame;

pub use command::{Command, CommandCode, CursorControl, MonitorOutput, SOUND_MODES, SOURCES};
pub use decode::{decode, Decoded};
pub use error::ProtocolError;
pub use frame::{ProtocolEvent, FRAME_TERMINATOR, MAX_FRAME_LEN, OPERATION_STATUS};
