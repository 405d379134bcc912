//! Outgoing commands.
//!
//! A command is written as `code + parameter + "\r"`. Status queries use
//! `?` as the parameter (`"MV?"`); the receiver answers with regular
//! status lines, there are no correlated responses.

use std::fmt;

use avr_core::encode_volume;

use crate::error::ProtocolError;
use crate::frame::FRAME_TERMINATOR;

/// Parameter that turns any code into a status query.
const QUERY: &str = "?";

/// Two-character command mnemonics understood by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    /// Overall power (`PWON`, `PWSTANDBY`).
    Power,
    /// Main zone power (`ZMON`, `ZMOFF`).
    MainZone,
    /// Master volume (`MV50`, `MVUP`).
    MasterVolume,
    /// Mute (`MUON`, `MUOFF`).
    Mute,
    /// Input source select (`SIDVD`).
    SelectInput,
    /// Surround mode (`MSSTEREO`).
    SurroundMode,
    /// On-screen menu navigation (`MNCUP`).
    Menu,
    /// Video select, used for monitor outputs (`VSMONI1`).
    VideoSelect,
}

impl CommandCode {
    /// The wire mnemonic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Power => "PW",
            Self::MainZone => "ZM",
            Self::MasterVolume => "MV",
            Self::Mute => "MU",
            Self::SelectInput => "SI",
            Self::SurroundMode => "MS",
            Self::Menu => "MN",
            Self::VideoSelect => "VS",
        }
    }

    /// Looks up a mnemonic.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "PW" => Some(Self::Power),
            "ZM" => Some(Self::MainZone),
            "MV" => Some(Self::MasterVolume),
            "MU" => Some(Self::Mute),
            "SI" => Some(Self::SelectInput),
            "MS" => Some(Self::SurroundMode),
            "MN" => Some(Self::Menu),
            "VS" => Some(Self::VideoSelect),
            _ => None,
        }
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cursor and menu navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorControl {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Return,
    Menu,
    Info,
}

impl CursorControl {
    /// Menu parameter for this key.
    pub fn parameter(&self) -> &'static str {
        match self {
            Self::Up => "CUP",
            Self::Down => "CDN",
            Self::Left => "CLT",
            Self::Right => "CRT",
            Self::Enter => "ENT",
            Self::Return => "RTN",
            Self::Menu => "MEN ON",
            Self::Info => "INF",
        }
    }
}

/// HDMI monitor output selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorOutput {
    Monitor1,
    Monitor2,
    Auto,
}

impl MonitorOutput {
    /// Video select parameter for this output.
    pub fn parameter(&self) -> &'static str {
        match self {
            Self::Monitor1 => "MONI1",
            Self::Monitor2 => "MONI2",
            Self::Auto => "MONIAUTO",
        }
    }
}

/// Surround modes offered for selection.
pub const SOUND_MODES: [&str; 16] = [
    "MOVIE",
    "MUSIC",
    "GAME",
    "DIRECT",
    "PURE DIRECT",
    "STEREO",
    "AUTO",
    "DOLBY DIGITAL",
    "DTS SURROUND",
    "MCH STEREO",
    "ROCK ARENA",
    "JAZZ CLUB",
    "MONO MOVIE",
    "MATRIX",
    "VIDEO GAME",
    "VIRTUAL",
];

/// Input sources offered for selection.
pub const SOURCES: [&str; 14] = [
    "PHONO", "CD", "DVD", "BD", "TV", "SAT/CBL", "MPLAY", "GAME", "TUNER", "AUX1", "AUX2", "NET",
    "BT", "USB/IPOD",
];

/// A single outgoing command frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    code: String,
    parameter: String,
}

impl Command {
    /// Builds a command from a known code and a parameter.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidCommand` if the parameter contains a
    /// line break, which would split it into two frames.
    pub fn new(code: CommandCode, parameter: impl Into<String>) -> Result<Self, ProtocolError> {
        Self::build(code.as_str().to_string(), parameter.into())
    }

    /// Builds a command from raw text (`"MVUP"`, `"PSBAS UP"`).
    ///
    /// The first two characters are the code, the rest is the parameter.
    /// Codes outside `CommandCode` are allowed.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidCommand` if the text is shorter than
    /// a code or contains a line break.
    pub fn raw(text: &str) -> Result<Self, ProtocolError> {
        let text = text.trim();
        let split = match text.char_indices().nth(2) {
            Some((idx, _)) => idx,
            None if text.chars().count() == 2 => text.len(),
            None => {
                return Err(ProtocolError::InvalidCommand {
                    command: text.to_string(),
                    reason: "shorter than a command code".to_string(),
                })
            }
        };
        let (code, parameter) = text.split_at(split);
        Self::build(code.to_string(), parameter.to_string())
    }

    fn build(code: String, parameter: String) -> Result<Self, ProtocolError> {
        if code.contains(['\r', '\n']) || parameter.contains(['\r', '\n']) {
            return Err(ProtocolError::InvalidCommand {
                command: format!("{code}{parameter}"),
                reason: "contains a line break".to_string(),
            });
        }
        Ok(Self { code, parameter })
    }

    fn fixed(code: CommandCode, parameter: &'static str) -> Self {
        Self {
            code: code.as_str().to_string(),
            parameter: parameter.to_string(),
        }
    }

    /// The command code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The parameter following the code.
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Bytes written to the wire, terminator included.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.code.len() + self.parameter.len() + 1);
        frame.extend_from_slice(self.code.as_bytes());
        frame.extend_from_slice(self.parameter.as_bytes());
        frame.push(FRAME_TERMINATOR);
        frame
    }

    // ------------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------------

    pub fn main_zone_on() -> Self {
        Self::fixed(CommandCode::MainZone, "ON")
    }

    pub fn main_zone_off() -> Self {
        Self::fixed(CommandCode::MainZone, "OFF")
    }

    pub fn power_on() -> Self {
        Self::fixed(CommandCode::Power, "ON")
    }

    pub fn power_standby() -> Self {
        Self::fixed(CommandCode::Power, "STANDBY")
    }

    /// Sets the master volume to a device-scale level (0.0..=98.0).
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Decode` if the level is out of range.
    pub fn set_volume(level: f64) -> Result<Self, ProtocolError> {
        let parameter = encode_volume(level)?;
        Self::new(CommandCode::MasterVolume, parameter)
    }

    pub fn volume_up() -> Self {
        Self::fixed(CommandCode::MasterVolume, "UP")
    }

    pub fn volume_down() -> Self {
        Self::fixed(CommandCode::MasterVolume, "DOWN")
    }

    pub fn mute(on: bool) -> Self {
        Self::fixed(CommandCode::Mute, if on { "ON" } else { "OFF" })
    }

    /// Selects an input source by its protocol name (`"DVD"`, `"SAT/CBL"`).
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidCommand` if the name contains a line break.
    pub fn select_source(source: &str) -> Result<Self, ProtocolError> {
        Self::new(CommandCode::SelectInput, source)
    }

    /// Selects a surround mode by its protocol name (`"STEREO"`).
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidCommand` if the name contains a line break.
    pub fn sound_mode(mode: &str) -> Result<Self, ProtocolError> {
        Self::new(CommandCode::SurroundMode, mode)
    }

    pub fn cursor(control: CursorControl) -> Self {
        Self::fixed(CommandCode::Menu, control.parameter())
    }

    pub fn monitor_output(output: MonitorOutput) -> Self {
        Self::fixed(CommandCode::VideoSelect, output.parameter())
    }

    /// Asks the receiver to report the current value for `code`.
    pub fn query(code: CommandCode) -> Self {
        Self::fixed(code, QUERY)
    }

    /// Queries for every attribute the decoder tracks.
    pub fn status_queries() -> Vec<Self> {
        [
            CommandCode::Power,
            CommandCode::MainZone,
            CommandCode::MasterVolume,
            CommandCode::Mute,
            CommandCode::SelectInput,
            CommandCode::SurroundMode,
        ]
        .into_iter()
        .map(Self::query)
        .collect()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.code, self.parameter)
    }
}
