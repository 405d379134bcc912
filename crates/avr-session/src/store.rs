//! Attribute store and change-handler registry.
//!
//! The store keeps the last decoded value for every attribute and a list
//! of handlers per attribute name. Only the dispatcher writes; external
//! callers may read at any time without snapshot isolation.
//!
//! # Registration Window
//!
//! Handlers are added during setup. `Session::listen` seals the store
//! before the first frame is read, so no handler can miss an update it
//! was registered for. Late registration fails with
//! `SessionError::RegistrationClosed`.
//!
//! # Handler Isolation
//!
//! Each handler runs inside `catch_unwind`. A panicking handler is logged
//! and skipped; the stored value, the remaining handlers and later events
//! are unaffected.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use avr_core::AttributeValue;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};

/// Callback invoked with the new value of an attribute.
pub type AttributeHandler = Arc<dyn Fn(&AttributeValue) + Send + Sync>;

/// Counts from one `set_attribute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandlerOutcome {
    /// Handlers that ran to completion.
    pub completed: usize,
    /// Handlers that panicked.
    pub panicked: usize,
}

/// Last-known attribute values plus their change handlers.
#[derive(Default)]
pub struct AttributeStore {
    values: RwLock<HashMap<String, AttributeValue>>,
    handlers: RwLock<HashMap<String, Vec<AttributeHandler>>>,
    sealed: AtomicBool,
}

impl AttributeStore {
    /// Creates an empty, unsealed store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler for `name`.
    ///
    /// Handlers for the same name run in registration order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RegistrationClosed` once the store is sealed.
    pub fn add_handler<F>(&self, name: impl Into<String>, handler: F) -> Result<()>
    where
        F: Fn(&AttributeValue) + Send + Sync + 'static,
    {
        let name = name.into();
        let mut handlers = self.handlers.write();

        // Checked under the write lock so a concurrent seal cannot slip in between
        if self.is_sealed() {
            return Err(SessionError::RegistrationClosed { attribute: name });
        }

        handlers.entry(name).or_default().push(Arc::new(handler));
        Ok(())
    }

    /// Closes the registration window. Idempotent.
    pub fn seal(&self) {
        let _guard = self.handlers.write();
        self.sealed.store(true, Ordering::Release);
    }

    /// Returns true once registration is closed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Number of handlers registered for `name`.
    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers.read().get(name).map_or(0, Vec::len)
    }

    /// Stores `value` under `name`, then runs every handler for `name`.
    ///
    /// The value is stored unconditionally; handlers fire even if it did not
    /// change. Handlers run after the store lock is released, so a handler
    /// calling `get_attribute` sees the new value.
    pub fn set_attribute(&self, name: &str, value: AttributeValue) -> HandlerOutcome {
        self.values.write().insert(name.to_string(), value.clone());

        let handlers: Vec<AttributeHandler> = self
            .handlers
            .read()
            .get(name)
            .cloned()
            .unwrap_or_default();

        let mut outcome = HandlerOutcome::default();
        for (index, handler) in handlers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(&value))) {
                Ok(()) => outcome.completed += 1,
                Err(panic) => {
                    outcome.panicked += 1;
                    warn!(
                        attribute = name,
                        handler = index,
                        panic = panic_message(panic.as_ref()),
                        "Attribute handler panicked"
                    );
                }
            }
        }

        debug!(
            attribute = name,
            value = %value,
            handlers = handlers.len(),
            "Attribute updated"
        );

        outcome
    }

    /// Returns the last value stored under `name`.
    pub fn get_attribute(&self, name: &str) -> Option<AttributeValue> {
        self.values.read().get(name).cloned()
    }

    /// Returns a copy of every stored attribute.
    pub fn snapshot(&self) -> HashMap<String, AttributeValue> {
        self.values.read().clone()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_set_then_get() {
        let store = AttributeStore::new();
        assert_eq!(store.get_attribute("MainZoneVolume"), None);

        store.set_attribute("MainZoneVolume", AttributeValue::Number(-40.0));

        assert_eq!(
            store.get_attribute("MainZoneVolume"),
            Some(AttributeValue::Number(-40.0))
        );
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let store = AttributeStore::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let calls = Arc::clone(&calls);
            store
                .add_handler("MainZoneMute", move |_| calls.lock().push(id))
                .unwrap();
        }

        let outcome = store.set_attribute("MainZoneMute", "on".into());

        assert_eq!(*calls.lock(), vec![0, 1, 2]);
        assert_eq!(outcome.completed, 3);
        assert_eq!(outcome.panicked, 0);
    }

    #[test]
    fn test_handlers_only_see_their_attribute() {
        let store = AttributeStore::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        store
            .add_handler("POWER", move |_| *counter.lock() += 1)
            .unwrap();

        store.set_attribute("MainZonePower", "ON".into());
        assert_eq!(*calls.lock(), 0);

        store.set_attribute("POWER", "ON".into());
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn test_handler_sees_new_value() {
        let store = Arc::new(AttributeStore::new());
        let seen = Arc::new(Mutex::new(None));

        let reader = Arc::clone(&store);
        let observed = Arc::clone(&seen);
        store
            .add_handler("MainZoneVolume", move |_| {
                *observed.lock() = reader.get_attribute("MainZoneVolume");
            })
            .unwrap();

        store.set_attribute("MainZoneVolume", AttributeValue::Number(-20.5));

        assert_eq!(*seen.lock(), Some(AttributeValue::Number(-20.5)));
    }

    #[test]
    fn test_unchanged_value_still_notifies() {
        let store = AttributeStore::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        store
            .add_handler("POWER", move |_| *counter.lock() += 1)
            .unwrap();

        store.set_attribute("POWER", "ON".into());
        store.set_attribute("POWER", "ON".into());

        assert_eq!(*calls.lock(), 2);
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let store = AttributeStore::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        store
            .add_handler("MainZoneMute", |_| panic!("observer bug"))
            .unwrap();
        let after = Arc::clone(&calls);
        store
            .add_handler("MainZoneMute", move |value| {
                after.lock().push(value.clone());
            })
            .unwrap();

        let first = store.set_attribute("MainZoneMute", "on".into());
        let second = store.set_attribute("MainZoneMute", "off".into());

        assert_eq!(first, HandlerOutcome { completed: 1, panicked: 1 });
        assert_eq!(second, HandlerOutcome { completed: 1, panicked: 1 });
        assert_eq!(
            *calls.lock(),
            vec![AttributeValue::from("on"), AttributeValue::from("off")]
        );
        assert_eq!(store.get_attribute("MainZoneMute"), Some("off".into()));
    }

    #[test]
    fn test_zero_handlers_still_stores() {
        let store = AttributeStore::new();
        let outcome = store.set_attribute("POWER", "STANDBY".into());
        assert_eq!(outcome, HandlerOutcome::default());
        assert_eq!(store.get_attribute("POWER"), Some("STANDBY".into()));
    }

    #[test]
    fn test_registration_closed_after_seal() {
        let store = AttributeStore::new();
        store.add_handler("POWER", |_| {}).unwrap();
        store.seal();
        store.seal();

        let result = store.add_handler("POWER", |_| {});

        assert!(matches!(
            result,
            Err(SessionError::RegistrationClosed { attribute }) if attribute == "POWER"
        ));
        assert_eq!(store.handler_count("POWER"), 1);
    }

    #[test]
    fn test_snapshot_copies_values() {
        let store = AttributeStore::new();
        store.set_attribute("POWER", "ON".into());
        store.set_attribute("MainZoneVolume", AttributeValue::Number(-30.0));

        let snapshot = store.snapshot();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("POWER"), Some(&AttributeValue::from("ON")));
    }
}
