//! AVR Core - Shared types for receiver control
//!
//! This crate provides the domain types shared between the protocol
//! decoder (avr-protocol), the session engine (avr-session) and the CLI.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod attribute;
pub mod error;
pub mod state;
pub mod volume;

// Re-exports for convenience
pub use attribute::{names, AttributeValue};
pub use error::{DomainError, DomainResult};
pub use state::ConnectionState;
pub use volume::{
    db_to_level, decode_volume, encode_volume, level_to_db, VolumeReading, MAX_VOLUME,
    VOLUME_OFFSET,
};
