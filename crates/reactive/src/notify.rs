//! View notifications.
//!
//! A view publishes on two channels:
//!
//! - **property-changed**: which view properties changed (`Count` and/or the
//!   indexer). Always delivered synchronously.
//! - **collection-changed**: the structural event itself. Delivered through
//!   the configured scheduler when there is one, inline otherwise.
//!
//! A batch is never forwarded as a raw sequence: an empty batch publishes
//! nothing, a single event is published as-is, and anything longer is
//! published as one `Reset`.

use crate::observer::{Observers, Subscription};
use crate::scheduler::SharedScheduler;
use liveseq_core::{Batch, BatchExt, ChangeEvent, ChangeKind, Element};

/// A view property reported on the property-changed channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    /// The element count.
    Count,
    /// The positional indexer (element at an index).
    Indexer,
}

impl Property {
    /// Returns the conventional property name.
    pub fn name(self) -> &'static str {
        match self {
            Property::Count => "Count",
            Property::Indexer => "Item[]",
        }
    }

    /// Returns the properties affected by an event of the given kind.
    pub fn affected_by(kind: ChangeKind) -> &'static [Property] {
        if kind.changes_count() {
            &[Property::Count, Property::Indexer]
        } else {
            &[Property::Indexer]
        }
    }
}

/// Publishes property and collection notifications for one view.
pub struct Notifier<T> {
    scheduler: Option<SharedScheduler>,
    properties: Observers<Property>,
    collection: Observers<ChangeEvent<T>>,
}

impl<T: Element> Notifier<T> {
    /// Creates a notifier. With `None`, collection notifications are
    /// delivered inline.
    pub fn new(scheduler: Option<SharedScheduler>) -> Self {
        Self {
            scheduler,
            properties: Observers::new(),
            collection: Observers::new(),
        }
    }

    /// Registers a collection-changed observer.
    pub fn subscribe_collection<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&ChangeEvent<T>) + Send + Sync + 'static,
    {
        self.collection.subscribe(observer)
    }

    /// Registers a property-changed observer.
    pub fn subscribe_property<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Property) + Send + Sync + 'static,
    {
        self.properties.subscribe(observer)
    }

    /// Publishes a batch. Returns the kind of the structural event that was
    /// published, if any.
    pub fn notify(&self, batch: Batch<T>) -> Option<ChangeKind> {
        let event = batch.collapse()?;
        let kind = event.kind();
        self.dispatch(event);
        Some(kind)
    }

    /// Publishes a single event.
    pub fn notify_event(&self, event: ChangeEvent<T>) {
        self.dispatch(event);
    }

    /// Drops every observer.
    pub fn clear(&self) {
        self.properties.clear();
        self.collection.clear();
    }

    fn dispatch(&self, event: ChangeEvent<T>) {
        for property in Property::affected_by(event.kind()) {
            self.properties.notify(property);
        }

        match &self.scheduler {
            Some(scheduler) => {
                let collection = self.collection.clone();
                scheduler.schedule(Box::new(move || collection.notify(&event)));
            }
            None => self.collection.notify(&event),
        }
    }
}
