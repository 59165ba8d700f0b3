//! Payload-free recompute signals.

use crate::observer::{Observers, Subscription};

/// A signal forcing dependent views to recompute, e.g. because state read by
/// a filter predicate changed outside the source collection.
///
/// Clones share the same observer list.
#[derive(Clone, Default)]
pub struct Trigger {
    observers: Observers<()>,
}

impl Trigger {
    /// Creates a trigger with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals every observer.
    pub fn fire(&self) {
        tracing::trace!(observers = self.observers.len(), "trigger fired");
        self.observers.notify(&());
    }

    /// Registers an observer.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers.subscribe(move |_| observer())
    }

    /// Returns the number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("observers", &self.observers.len())
            .finish()
    }
}
