//! Error types for the session engine.
//!
//! Errors are classified so the caller can decide what to do next:
//! - `ConnectionLost` is retryable: reconnect and listen again
//! - `Connect` / `ConnectTimeout` mean no session was established
//! - everything else is returned to the caller of a single operation
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use std::time::Duration;

use avr_protocol::ProtocolError;
use thiserror::Error;

// ============================================================================
// Loss Reason
// ============================================================================

/// Why a listening session lost its connection.
///
/// The receiver cannot tell a blank line from a closed socket in its own
/// protocol; both are retryable, but they are reported separately.
#[derive(Error, Debug)]
pub enum LossReason {
    /// The receiver closed the stream.
    #[error("end of stream")]
    EndOfStream,

    /// A frame was empty after trimming.
    #[error("empty frame")]
    EmptyFrame,

    /// No frame terminator within the size limit; the stream is misaligned.
    #[error("frame exceeded {limit} bytes without a terminator")]
    FrameTooLong {
        /// Maximum accepted frame length.
        limit: usize,
    },

    /// The read itself failed (reset, keep-alive timeout).
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
}

// ============================================================================
// Session Error Type
// ============================================================================

/// Session engine errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Dialing the receiver did not complete in time.
    #[error("Timed out connecting to {address} after {timeout:?}")]
    ConnectTimeout {
        /// Address that was dialed.
        address: String,
        /// Configured connect timeout.
        timeout: Duration,
    },

    /// Dialing the receiver failed (refused, unreachable, socket setup).
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        /// Address that was dialed.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An established session lost its connection.
    ///
    /// Retryable: the caller may reconnect.
    #[error("Lost connection to receiver: {reason}")]
    ConnectionLost {
        /// What ended the read loop.
        reason: LossReason,
    },

    /// No transport is open.
    #[error("Not connected to receiver")]
    NotConnected,

    /// Handlers can only be added before the session starts listening.
    #[error("Handler registration is closed (attribute: {attribute})")]
    RegistrationClosed {
        /// Attribute the late handler was meant for.
        attribute: String,
    },

    /// A command could not be built.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport error while writing a command.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SessionError {
    /// Creates a connection-lost error.
    pub fn lost(reason: LossReason) -> Self {
        Self::ConnectionLost { reason }
    }

    /// Returns true if the caller may reconnect and listen again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionLost { .. })
    }

    /// Returns true if no session could be established.
    #[must_use]
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. } | Self::Connect { .. })
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

// ============================================================================
// Tests
// ============================================================================
