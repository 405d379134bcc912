//! Frame parsing.
//!
//! A frame is one carriage-return terminated line. Its first two
//! characters are the command mnemonic, immediately followed by the
//! parameter. Some frames carry a secondary payload after a single
//! space:
//!
//! ```text
//! MV105           code "MV", parameter "105"
//! MVMAX 98        code "MV", parameter "MAX", payload "98"
//! MSDOLBY DIGITAL code "MS", parameter "DOLBY", payload "DIGITAL"
//! ```

use crate::error::ProtocolError;

/// Byte that terminates every frame on the wire.
pub const FRAME_TERMINATOR: u8 = b'\r';

/// Longest frame accepted before the stream is considered misaligned.
pub const MAX_FRAME_LEN: usize = 1024;

/// High-frequency operation status line, dropped without decoding.
pub const OPERATION_STATUS: &str = "OPSTS";

/// Width of the command mnemonic.
const CODE_WIDTH: usize = 2;

/// A status line split into command code, parameter and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolEvent {
    raw: String,
    code: String,
    parameter: String,
    payload: Option<String>,
}

impl ProtocolEvent {
    /// Parses a trimmed frame.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::MalformedFrame` if the pre-space token is
    /// shorter than a command code.
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let (head, payload) = match frame.split_once(' ') {
            Some((head, rest)) => (head, Some(rest.to_string())),
            None => (frame, None),
        };

        if head.chars().count() < CODE_WIDTH {
            return Err(ProtocolError::MalformedFrame {
                frame: frame.to_string(),
                reason: "shorter than a command code".to_string(),
            });
        }

        // Split on a char boundary; the protocol is ASCII but the wire is not trusted
        let split = head
            .char_indices()
            .nth(CODE_WIDTH)
            .map_or(head.len(), |(idx, _)| idx);
        let (code, parameter) = head.split_at(split);

        Ok(Self {
            raw: frame.to_string(),
            code: code.to_string(),
            parameter: parameter.to_string(),
            payload,
        })
    }

    /// The frame as received (trimmed).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The two-character command code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Everything between the code and the first space.
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Text after the first space, if any.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// The command token: code plus parameter.
    pub fn command(&self) -> String {
        format!("{}{}", self.code, self.parameter)
    }

    /// The value the frame carries.
    ///
    /// Usually the parameter; when the parameter is empty and the value
    /// was sent space-separated (`"MU ON"`), the payload.
    pub fn argument(&self) -> &str {
        if self.parameter.is_empty() {
            self.payload.as_deref().unwrap_or_default()
        } else {
            &self.parameter
        }
    }

    /// Everything after the code, spaces preserved (`"DOLBY DIGITAL"`).
    pub fn remainder(&self) -> &str {
        self.raw
            .get(self.code.len()..)
            .unwrap_or_default()
            .trim()
    }

    /// Returns true for the operation status heartbeat.
    #[must_use]
    pub fn is_operation_status(&self) -> bool {
        self.command() == OPERATION_STATUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_and_parameter() {
        let event = ProtocolEvent::parse("MV105").unwrap();
        assert_eq!(event.code(), "MV");
        assert_eq!(event.parameter(), "105");
        assert_eq!(event.payload(), None);
        assert_eq!(event.raw(), "MV105");
        assert_eq!(event.command(), "MV105");
    }

    #[test]
    fn test_parse_secondary_payload() {
        let event = ProtocolEvent::parse("MVMAX 98").unwrap();
        assert_eq!(event.code(), "MV");
        assert_eq!(event.parameter(), "MAX");
        assert_eq!(event.payload(), Some("98"));
        assert_eq!(event.argument(), "MAX");
    }

    #[test]
    fn test_argument_falls_back_to_payload() {
        let event = ProtocolEvent::parse("MU ON").unwrap();
        assert_eq!(event.parameter(), "");
        assert_eq!(event.argument(), "ON");
    }

    #[test]
    fn test_remainder_keeps_spaces() {
        let event = ProtocolEvent::parse("MSDOLBY DIGITAL").unwrap();
        assert_eq!(event.parameter(), "DOLBY");
        assert_eq!(event.payload(), Some("DIGITAL"));
        assert_eq!(event.remainder(), "DOLBY DIGITAL");
    }

    #[test]
    fn test_bare_code_has_empty_parameter() {
        let event = ProtocolEvent::parse("PW").unwrap();
        assert_eq!(event.code(), "PW");
        assert_eq!(event.parameter(), "");
        assert_eq!(event.argument(), "");
    }

    #[test]
    fn test_too_short_is_malformed() {
        assert!(matches!(
            ProtocolEvent::parse("M"),
            Err(ProtocolError::MalformedFrame { .. })
        ));
        assert!(ProtocolEvent::parse("").is_err());
        assert!(ProtocolEvent::parse(" ON").is_err());
    }

    #[test]
    fn test_multibyte_code_does_not_panic() {
        let event = ProtocolEvent::parse("ÄÖ12").unwrap();
        assert_eq!(event.code(), "ÄÖ");
        assert_eq!(event.parameter(), "12");
    }

    #[test]
    fn test_operation_status_detection() {
        assert!(ProtocolEvent::parse("OPSTS").unwrap().is_operation_status());
        assert!(!ProtocolEvent::parse("OPINF").unwrap().is_operation_status());
        assert!(!ProtocolEvent::parse("MV50").unwrap().is_operation_status());
    }
}
