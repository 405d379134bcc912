//! Event dispatcher: raw frames in, attribute updates out.
//!
//! The dispatcher is the only writer of the attribute store. It consumes
//! frames strictly in arrival order, so handlers for one attribute never
//! run concurrently.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use avr_protocol::{decode, Decoded, ProtocolEvent};

use crate::store::{AttributeStore, HandlerOutcome};

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// An attribute was written and its handlers ran.
    Updated {
        attribute: &'static str,
        handlers: HandlerOutcome,
    },

    /// Operation status heartbeat, dropped silently.
    Ignored,

    /// Recognized frame without a value (volume limit).
    Skipped,

    /// Code outside the decode table.
    Unrecognized,

    /// Frame could not be parsed or decoded; nothing was written.
    Rejected,
}

/// Routes decoded frames into the attribute store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<AttributeStore>,
}

impl Dispatcher {
    /// Creates a dispatcher writing into `store`.
    pub fn new(store: Arc<AttributeStore>) -> Self {
        Self { store }
    }

    /// Parses, decodes and applies a single frame.
    ///
    /// Never fails: malformed input is logged and reported as
    /// `Dispatch::Rejected`.
    pub fn dispatch(&self, frame: &str) -> Dispatch {
        let event = match ProtocolEvent::parse(frame) {
            Ok(event) => event,
            Err(e) => {
                warn!(raw = %frame, error = %e, "Dropping malformed frame");
                return Dispatch::Rejected;
            }
        };

        let decoded = match decode(&event) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(
                    raw = %event.raw(),
                    command = %event.code(),
                    parameter = %event.parameter(),
                    error = %e,
                    "Failed to decode frame"
                );
                return Dispatch::Rejected;
            }
        };

        match decoded {
            Decoded::Ignored => Dispatch::Ignored,
            Decoded::Skipped => {
                debug!(
                    raw = %event.raw(),
                    command = %event.code(),
                    parameter = %event.parameter(),
                    "Skipped frame"
                );
                Dispatch::Skipped
            }
            Decoded::Unrecognized => {
                debug!(
                    raw = %event.raw(),
                    command = %event.code(),
                    parameter = %event.parameter(),
                    "Unrecognized frame"
                );
                Dispatch::Unrecognized
            }
            Decoded::Update { attribute, value } => {
                debug!(
                    raw = %event.raw(),
                    command = %event.code(),
                    parameter = %event.parameter(),
                    attribute,
                    "Decoded frame"
                );
                let handlers = self.store.set_attribute(attribute, value);
                Dispatch::Updated {
                    attribute,
                    handlers,
                }
            }
        }
    }

    /// Consumes frames until shutdown or until the sender is dropped.
    ///
    /// Shutdown is checked before every receive. A frame that is already
    /// being dispatched finishes, handlers included.
    pub async fn run(self, mut frames: mpsc::Receiver<String>, shutdown: CancellationToken) {
        debug!("Dispatcher started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Dispatcher stopping (shutdown)");
                    break;
                }

                frame = frames.recv() => {
                    match frame {
                        Some(frame) => {
                            self.dispatch(&frame);
                        }
                        None => {
                            debug!("Dispatcher stopping (reader closed)");
                            break;
                        }
                    }
                }
            }
        }
    }
}
