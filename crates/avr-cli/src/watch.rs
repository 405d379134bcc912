//! Change records printed by `avrctl watch`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use avr_core::{AttributeValue, ConnectionState};

/// One line of watch output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatchRecord {
    /// An attribute was reported.
    Attribute {
        timestamp: DateTime<Utc>,
        attribute: String,
        value: AttributeValue,
    },

    /// The connection state changed.
    Connection {
        timestamp: DateTime<Utc>,
        state: ConnectionState,
    },
}

impl WatchRecord {
    pub fn attribute(attribute: &str, value: &AttributeValue) -> Self {
        Self::Attribute {
            timestamp: Utc::now(),
            attribute: attribute.to_string(),
            value: value.clone(),
        }
    }

    pub fn connection(state: ConnectionState) -> Self {
        Self::Connection {
            timestamp: Utc::now(),
            state,
        }
    }

    /// Human-readable line.
    pub fn to_text(&self) -> String {
        match self {
            Self::Attribute {
                timestamp,
                attribute,
                value,
            } => format!("{} {attribute} = {value}", timestamp.format("%H:%M:%S")),
            Self::Connection { timestamp, state } => {
                format!("{} [{state}]", timestamp.format("%H:%M:%S"))
            }
        }
    }

    /// Single-line JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; with these field types it does not fail.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_attribute_text() {
        let record = WatchRecord::Attribute {
            timestamp: at_noon(),
            attribute: "MainZoneVolume".to_string(),
            value: AttributeValue::Number(-69.5),
        };
        assert_eq!(record.to_text(), "12:00:00 MainZoneVolume = -69.5");
    }

    #[test]
    fn test_attribute_json() {
        let record = WatchRecord::Attribute {
            timestamp: at_noon(),
            attribute: "MainZoneMute".to_string(),
            value: "on".into(),
        };

        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(json["kind"], "attribute");
        assert_eq!(json["attribute"], "MainZoneMute");
        assert_eq!(json["value"], "on");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_connection_record() {
        let record = WatchRecord::Connection {
            timestamp: at_noon(),
            state: ConnectionState::Connected,
        };
        assert_eq!(record.to_text(), "12:00:00 [connected]");

        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "connection");
        assert_eq!(json["state"], "connected");
    }
}
