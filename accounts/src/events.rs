//! Account change notifications.
//!
//! The store emits typed events so UI and mail-operation layers can react to
//! account changes without polling. Delivery is synchronous and in-process:
//! listeners run on the emitting thread, in registration order, before the
//! emitting call returns.

use std::sync::Arc;

use parking_lot::RwLock;

/// Events emitted by the account store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    /// A new account was created
    Inserted {
        /// Name of the new account
        name: String,
    },
    /// An account and its server accounts were removed
    Removed {
        /// Name of the removed account
        name: String,
    },
    /// A setting of an account changed
    Changed {
        /// Name of the affected account
        name: String,
        /// True when the change happened in the server account namespace
        server: bool,
    },
    /// An account entered or left the busy set
    BusyChanged {
        /// Name of the affected account
        name: String,
        /// New busy state
        busy: bool,
    },
    /// The default account pointer changed
    DefaultChanged,
    /// The display name of an account changed
    DisplayNameChanged {
        /// Name of the affected account
        name: String,
    },
}

type Listener = Arc<dyn Fn(&AccountEvent) + Send + Sync>;

/// Synchronous observer registry.
#[derive(Default)]
pub(crate) struct EventDispatcher {
    listeners: RwLock<Vec<Listener>>,
}

impl EventDispatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&self, listener: impl Fn(&AccountEvent) + Send + Sync + 'static) {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Deliver `event` to every listener, in registration order.
    ///
    /// The listener list is snapshotted first, so a listener may subscribe
    /// or call back into the store without deadlocking.
    pub(crate) fn emit(&self, event: &AccountEvent) {
        let listeners: Vec<Listener> = self.listeners.read().clone();
        for listener in &listeners {
            listener(event);
        }
    }
}
