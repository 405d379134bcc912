//! Error types for the avrctl front end.

use std::io;
use std::path::PathBuf;

use avr_session::SessionError;
use thiserror::Error;

/// Errors from configuration loading and command execution.
#[derive(Error, Debug)]
pub enum CliError {
    /// Config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML for the expected schema.
    #[error("Invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A config value is out of range.
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// No receiver host in flags, environment or config file.
    #[error("No receiver host configured (use --host, AVR_HOST or the config file)")]
    MissingHost,

    /// The requested action cannot be performed.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Session engine failure.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Convenience Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_host_mentions_sources() {
        let message = CliError::MissingHost.to_string();
        assert!(message.contains("--host"));
        assert!(message.contains("AVR_HOST"));
    }

    #[test]
    fn test_session_error_is_transparent() {
        let error: CliError = SessionError::NotConnected.into();
        assert_eq!(error.to_string(), "Not connected to receiver");
    }
}
