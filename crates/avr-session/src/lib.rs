//! AVR Session - Telnet session engine for networked receivers
//!
//! This crate keeps a persistent connection to a receiver, decodes its
//! status lines into named attributes and notifies registered handlers.
//! Commands travel back over the same connection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  ReconnectingClient  │  backoff, status queries, cancellation
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐      ┌──────────────────┐
//! │       Session        │─────▶│  CommandWriter   │──▶ TCP :23
//! │  connect / listen /  │      └──────────────────┘
//! │     disconnect       │
//! └──────────┬───────────┘
//!            │ FrameReader ──mpsc(1)──▶ Dispatcher
//!            │                              │
//! ┌──────────▼───────────┐                  │ set_attribute
//! │   AttributeStore     │◀─────────────────┘
//! │  values + handlers   │──▶ on_change callbacks
//! └──────────────────────┘
//! ```
//!
//! `ReceiverControl` sits on top of a shared `Session` and turns device
//! actions into command frames.

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod reader;
pub mod receiver;
pub mod session;
pub mod store;
pub mod writer;

pub use client::{ReconnectConfig, ReconnectingClient};
pub use dispatcher::{Dispatch, Dispatcher};
pub use error::{LossReason, Result, SessionError};
pub use reader::FrameReader;
pub use receiver::ReceiverControl;
pub use session::{
    Session, SessionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_CONTROL_PORT, DEFAULT_KEEPALIVE,
};
pub use store::{AttributeHandler, AttributeStore, HandlerOutcome};
pub use writer::CommandWriter;
