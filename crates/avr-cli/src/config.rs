//! TOML configuration for avrctl.
//!
//! ```toml
//! host = "192.168.1.20"
//! port = 23
//! connect_timeout_secs = 5
//! keepalive_secs = 5
//! query_on_connect = true
//!
//! [reconnect]
//! initial_delay_ms = 1000
//! max_delay_ms = 30000
//! multiplier = 2.0
//! ```
//!
//! Every field is optional. The host has no default and must come from
//! somewhere: `--host` beats `AVR_HOST`, which beats the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use avr_session::{
    ReconnectConfig, SessionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_CONTROL_PORT,
    DEFAULT_KEEPALIVE,
};

use crate::error::{CliError, Result};

/// Environment variable naming the receiver host.
pub const HOST_ENV: &str = "AVR_HOST";

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Receiver hostname or IP address.
    pub host: Option<String>,

    /// Telnet control port.
    pub port: u16,

    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// TCP keep-alive idle time and probe interval in seconds.
    pub keepalive_secs: u64,

    /// Ask the receiver for its full state after every connect.
    pub query_on_connect: bool,

    /// Backoff between connection attempts.
    pub reconnect: ReconnectSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_CONTROL_PORT,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            keepalive_secs: DEFAULT_KEEPALIVE.as_secs(),
            query_on_connect: true,
            reconnect: ReconnectSettings::default(),
        }
    }
}

/// `[reconnect]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        let defaults = ReconnectConfig::default();
        Self {
            initial_delay_ms: duration_ms(defaults.initial_delay),
            max_delay_ms: duration_ms(defaults.max_delay),
            multiplier: defaults.multiplier,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Config {
    /// Default config file location: `<config dir>/avr/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("avr").join("config.toml"))
    }

    /// Loads and validates a config file.
    ///
    /// # Errors
    ///
    /// - `CliError::Read` if the file cannot be read
    /// - `CliError::Config` if it is not valid TOML for this schema
    /// - `CliError::InvalidValue` if a value is out of range
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Loads `explicit` if given, else the default file if it exists,
    /// else built-in defaults.
    ///
    /// # Errors
    ///
    /// Same as `load`. A missing explicit file is an error; a missing
    /// default file is not.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Applies command-line and environment overrides.
    ///
    /// Host precedence: `host_flag` > `host_env` > file.
    pub fn apply_overrides(
        &mut self,
        host_flag: Option<String>,
        host_env: Option<String>,
        port_flag: Option<u16>,
    ) {
        let nonblank = |h: &String| !h.trim().is_empty();
        if let Some(host) = host_flag.filter(nonblank).or(host_env.filter(nonblank)) {
            self.host = Some(host);
        }
        if let Some(port) = port_flag {
            self.port = port;
        }
    }

    /// Checks ranges the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns `CliError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(CliError::InvalidValue {
                field: "port",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.connect_timeout_secs == 0 {
            return Err(CliError::InvalidValue {
                field: "connect_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.keepalive_secs == 0 {
            return Err(CliError::InvalidValue {
                field: "keepalive_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.reconnect.initial_delay_ms == 0 {
            return Err(CliError::InvalidValue {
                field: "reconnect.initial_delay_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.reconnect.multiplier.is_finite() || self.reconnect.multiplier < 1.0 {
            return Err(CliError::InvalidValue {
                field: "reconnect.multiplier",
                reason: format!("{} is not a number >= 1.0", self.reconnect.multiplier),
            });
        }
        if self.reconnect.max_delay_ms < self.reconnect.initial_delay_ms {
            return Err(CliError::InvalidValue {
                field: "reconnect.max_delay_ms",
                reason: "must not be below initial_delay_ms".to_string(),
            });
        }
        Ok(())
    }

    /// Session settings for the configured receiver.
    ///
    /// # Errors
    ///
    /// Returns `CliError::MissingHost` if no host is configured.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(CliError::MissingHost)?;

        Ok(SessionConfig {
            host: host.to_string(),
            port: self.port,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            keepalive_interval: Duration::from_secs(self.keepalive_secs),
        })
    }

    /// Backoff settings for the reconnecting client.
    pub fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: Duration::from_millis(self.reconnect.initial_delay_ms),
            max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
            multiplier: self.reconnect.multiplier,
        }
    }
}
