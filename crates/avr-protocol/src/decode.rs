//! Decode table from protocol events to attribute updates.

use avr_core::{decode_volume, names, AttributeValue, VolumeReading};

use crate::command::CommandCode;
use crate::error::ProtocolError;
use crate::frame::ProtocolEvent;

/// Outcome of decoding one protocol event.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Write `value` to `attribute`.
    Update {
        attribute: &'static str,
        value: AttributeValue,
    },

    /// Operation status heartbeat; nothing to do and nothing to log.
    Ignored,

    /// Recognized but carries no attribute value (volume limit announcement).
    Skipped,

    /// Code not in the decode table.
    Unrecognized,
}

/// Decodes a protocol event.
///
/// Unknown codes decode to `Decoded::Unrecognized` so firmware additions
/// pass through harmlessly.
///
/// # Errors
///
/// Returns `ProtocolError::Decode` if a recognized code carries a
/// parameter that does not parse (a non-numeric volume).
pub fn decode(event: &ProtocolEvent) -> Result<Decoded, ProtocolError> {
    if event.is_operation_status() {
        return Ok(Decoded::Ignored);
    }

    let Some(code) = CommandCode::from_code(event.code()) else {
        return Ok(Decoded::Unrecognized);
    };

    let decoded = match code {
        CommandCode::Power => text(names::POWER, event.argument()),
        CommandCode::MainZone => text(names::MAIN_ZONE_POWER, event.argument()),
        CommandCode::MasterVolume => match decode_volume(event.argument())? {
            VolumeReading::Limit => Decoded::Skipped,
            VolumeReading::Db(db) => Decoded::Update {
                attribute: names::MAIN_ZONE_VOLUME,
                value: AttributeValue::Number(db),
            },
        },
        CommandCode::Mute => text(names::MAIN_ZONE_MUTE, &event.argument().to_lowercase()),
        CommandCode::SelectInput => text(names::MAIN_ZONE_INPUT, event.argument()),
        CommandCode::SurroundMode => text(names::MAIN_ZONE_SURROUND_MODE, event.remainder()),
        CommandCode::Menu | CommandCode::VideoSelect => Decoded::Unrecognized,
    };

    Ok(decoded)
}

fn text(attribute: &'static str, value: &str) -> Decoded {
    Decoded::Update {
        attribute,
        value: AttributeValue::Text(value.to_string()),
    }
}
