//! Volume scale conversions.
//!
//! The receiver reports and accepts master volume on an internal
//! 0..=98 scale where 80 is the 0 dB reference point. Half steps are
//! encoded by dropping the decimal point, and only then:
//!
//! ```text
//! 10.5  <->  "105"
//! 11.0  <->  "11"
//!  5.0  <->  "05"
//! ```
//!
//! Decoded values are rebased to dB (`level - 80`) and rounded to one
//! decimal place.

use crate::error::{DomainError, DomainResult};

/// Offset between the device scale and dB relative to the reference level.
pub const VOLUME_OFFSET: f64 = 80.0;

/// Highest level the device scale accepts.
pub const MAX_VOLUME: f64 = 98.0;

/// Parameter the receiver sends to announce its configured volume limit.
const MAX_MARKER: &str = "MAX";

/// Result of decoding a master volume parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeReading {
    /// The receiver announced its volume limit (`MVMAX ...`), not a level.
    Limit,

    /// Current volume in dB relative to the reference level.
    Db(f64),
}

/// Decodes a master volume parameter into dB.
///
/// # Errors
///
/// Returns `DomainError::ParseError` if the parameter is not a finite number.
pub fn decode_volume(parameter: &str) -> DomainResult<VolumeReading> {
    if parameter == MAX_MARKER {
        return Ok(VolumeReading::Limit);
    }

    let mut level: f64 = parameter.parse().map_err(|e| DomainError::ParseError {
        field: "volume".to_string(),
        reason: format!("{parameter:?}: {e}"),
    })?;

    if !level.is_finite() {
        return Err(DomainError::ParseError {
            field: "volume".to_string(),
            reason: format!("{parameter:?} is not a finite number"),
        });
    }

    // Three digits means the last one is the decimal ("105" is 10.5)
    if parameter.chars().count() == 3 {
        level /= 10.0;
    }

    Ok(VolumeReading::Db(round_tenth(level - VOLUME_OFFSET)))
}

/// Encodes a device-scale level (0.0..=98.0) as a master volume parameter.
///
/// The level is rounded to the nearest half step first.
///
/// # Errors
///
/// Returns `DomainError::InvalidFieldValue` if the level is outside the device scale.
pub fn encode_volume(level: f64) -> DomainResult<String> {
    if !level.is_finite() || !(0.0..=MAX_VOLUME).contains(&level) {
        return Err(DomainError::InvalidFieldValue {
            field: "volume".to_string(),
            value: level.to_string(),
            expected: format!("0.0..={MAX_VOLUME:.1}"),
        });
    }

    let half_steps = (level * 2.0).round() as u32;
    let whole = half_steps / 2;

    if half_steps % 2 == 1 {
        Ok(format!("{whole:02}5"))
    } else {
        Ok(format!("{whole:02}"))
    }
}

/// Converts dB relative to the reference level into the device scale.
pub fn db_to_level(db: f64) -> f64 {
    db + VOLUME_OFFSET
}

/// Converts a device-scale level into dB relative to the reference level.
pub fn level_to_db(level: f64) -> f64 {
    round_tenth(level - VOLUME_OFFSET)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_three_digits_has_half_step() {
        assert_eq!(decode_volume("105").unwrap(), VolumeReading::Db(-69.5));
    }

    #[test]
    fn test_decode_two_digits_is_whole() {
        assert_eq!(decode_volume("11").unwrap(), VolumeReading::Db(-69.0));
        assert_eq!(decode_volume("80").unwrap(), VolumeReading::Db(0.0));
        assert_eq!(decode_volume("98").unwrap(), VolumeReading::Db(18.0));
    }

    #[test]
    fn test_decode_lowest_half_step() {
        assert_eq!(decode_volume("005").unwrap(), VolumeReading::Db(-79.5));
    }

    #[test]
    fn test_decode_max_marker() {
        assert_eq!(decode_volume("MAX").unwrap(), VolumeReading::Limit);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_volume("UP"),
            Err(DomainError::ParseError { .. })
        ));
        assert!(decode_volume("").is_err());
        assert!(decode_volume("NaN").is_err());
        assert!(decode_volume("inf").is_err());
    }

    #[test]
    fn test_encode_whole_and_half_steps() {
        assert_eq!(encode_volume(10.5).unwrap(), "105");
        assert_eq!(encode_volume(11.0).unwrap(), "11");
        assert_eq!(encode_volume(5.0).unwrap(), "05");
        assert_eq!(encode_volume(0.5).unwrap(), "005");
        assert_eq!(encode_volume(0.0).unwrap(), "00");
        assert_eq!(encode_volume(98.0).unwrap(), "98");
    }

    #[test]
    fn test_encode_rounds_to_half_step() {
        assert_eq!(encode_volume(42.3).unwrap(), "425");
        assert_eq!(encode_volume(42.2).unwrap(), "42");
        assert_eq!(encode_volume(42.8).unwrap(), "43");
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        assert!(encode_volume(-1.0).is_err());
        assert!(encode_volume(98.5).is_err());
        assert!(encode_volume(f64::NAN).is_err());
    }

    #[test]
    fn test_encoded_level_decodes_back_to_db() {
        let encoded = encode_volume(35.5).unwrap();
        assert_eq!(decode_volume(&encoded).unwrap(), VolumeReading::Db(-44.5));
    }

    #[test]
    fn test_scale_conversions() {
        assert_eq!(db_to_level(-69.5), 10.5);
        assert_eq!(level_to_db(10.5), -69.5);
    }
}
