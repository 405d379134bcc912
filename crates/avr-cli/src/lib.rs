//! AVR CLI - configuration and actions behind the `avrctl` binary
//!
//! - `config`: TOML config file, environment and flag overrides
//! - `action`: one-shot receiver actions for `avrctl send`
//! - `watch`: change records printed by `avrctl watch`

pub mod action;
pub mod config;
pub mod error;
pub mod watch;

pub use action::{perform, Action, Direction, Output, STATE_TIMEOUT};
pub use config::{Config, ReconnectSettings, HOST_ENV};
pub use error::{CliError, Result};
pub use watch::WatchRecord;
