//! Observer lists and subscription handles.
//!
//! `Observers<A>` is the callback registry behind every notification
//! channel: sources publish raw change events through one, triggers publish
//! recompute signals, and views publish collection and property
//! notifications. Registering returns a [`Subscription`], a disposable handle
//! that unregisters the callback when disposed or dropped.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

/// Unique identifier for a subscription within one observer list.
pub type SubscriptionId = u64;

/// Callback type for notifications.
pub type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

struct ObserverList<A: ?Sized> {
    /// Ordered by id, so iteration follows registration order
    callbacks: BTreeMap<SubscriptionId, Callback<A>>,
    /// Next subscription ID to assign
    next_id: SubscriptionId,
}

/// A shared, ordered list of notification callbacks.
///
/// Callbacks run outside the list's lock, so a callback may subscribe,
/// unsubscribe or publish again without deadlocking. A callback removed
/// while a notification is in flight may still see that one notification.
pub struct Observers<A: ?Sized> {
    inner: Arc<Mutex<ObserverList<A>>>,
}

impl<A: ?Sized> Clone for Observers<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: ?Sized + 'static> Default for Observers<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> Observers<A> {
    /// Creates an empty observer list.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ObserverList {
                callbacks: BTreeMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Registers a callback. The returned subscription unregisters it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.subscribe_shared(Arc::new(callback))
    }

    /// Registers an already shared callback.
    pub fn subscribe_shared(&self, callback: Callback<A>) -> Subscription {
        let id = {
            let mut list = self.inner.lock();
            let id = list.next_id;
            list.next_id += 1;
            list.callbacks.insert(id, callback);
            id
        };

        let weak: Weak<Mutex<ObserverList<A>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(list) = weak.upgrade() {
                list.lock().callbacks.remove(&id);
            }
        })
    }

    /// Invokes every registered callback in registration order.
    pub fn notify(&self, value: &A) {
        let callbacks: Vec<Callback<A>> = self.inner.lock().callbacks.values().cloned().collect();
        for callback in callbacks {
            callback(value);
        }
    }

    /// Returns the number of registered callbacks.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.lock().callbacks.len()
    }

    /// Returns true if no callback is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().callbacks.is_empty()
    }

    /// Unregisters every callback.
    pub fn clear(&self) {
        self.inner.lock().callbacks.clear();
    }
}

/// A disposable registration.
///
/// Disposing (explicitly or by dropping) runs the teardown exactly once.
/// Teardown stops future deliveries; it does not recall work that was
/// already handed to a scheduler.
#[must_use = "dropping a Subscription disposes it immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Creates a subscription running `teardown` on disposal.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Creates a subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    /// Combines several subscriptions into one; disposal order follows the
    /// input order.
    pub fn all(subscriptions: Vec<Subscription>) -> Self {
        Self::new(move || drop(subscriptions))
    }

    /// Returns true until the subscription has been disposed or detached.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }

    /// Runs the teardown if it has not run yet.
    pub fn dispose(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    /// Gives up the handle without tearing down, keeping the registration
    /// alive for as long as its target lives.
    pub fn detach(mut self) {
        self.teardown = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Single-slot subscription holder.
///
/// Replacing the held subscription disposes the previous one, so at most one
/// subscription is live at a time. After [`dispose`](Self::dispose), any
/// subscription handed in is disposed immediately.
#[derive(Default)]
pub struct SerialSubscription {
    slot: Mutex<SerialSlot>,
}

#[derive(Default)]
struct SerialSlot {
    current: Option<Subscription>,
    disposed: bool,
}

impl SerialSubscription {
    /// Creates an empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `next`, disposing whatever was held before.
    pub fn replace(&self, next: Subscription) {
        let previous = {
            let mut slot = self.slot.lock();
            if slot.disposed {
                Some(next)
            } else {
                slot.current.replace(next)
            }
        };
        drop(previous);
    }

    /// Disposes the held subscription and every later one.
    pub fn dispose(&self) {
        let previous = {
            let mut slot = self.slot.lock();
            slot.disposed = true;
            slot.current.take()
        };
        drop(previous);
    }

    /// Returns true if a live subscription is held.
    pub fn is_active(&self) -> bool {
        self.slot
            .lock()
            .current
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Returns true once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.slot.lock().disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_observers_notify_in_registration_order() {
        let observers: Observers<i32> = Observers::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = log.clone();
        let _s1 = observers.subscribe(move |v| l1.lock().push(("first", *v)));
        let l2 = log.clone();
        let _s2 = observers.subscribe(move |v| l2.lock().push(("second", *v)));

        observers.notify(&7);

        assert_eq!(*log.lock(), vec![("first", 7), ("second", 7)]);
        assert_eq!(observers.len(), 2);
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let observers: Observers<()> = Observers::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let sub = observers.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        observers.notify(&());
        drop(sub);
        observers.notify(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(observers.is_empty());
    }

    #[test]
    fn test_subscription_dispose_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let mut sub = Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(sub.is_active());
        sub.dispose();
        sub.dispose();
        drop(sub);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_detach_keeps_registration() {
        let observers: Observers<()> = Observers::new();
        observers.subscribe(|_| {}).detach();
        assert_eq!(observers.len(), 1);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let observers: Observers<()> = Observers::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let s = slot.clone();
        let sub = observers.subscribe(move |_| {
            s.lock().take();
        });
        *slot.lock() = Some(sub);

        observers.notify(&());
        assert!(observers.is_empty());
    }

    #[test]
    fn test_serial_subscription_replaces() {
        let count = Arc::new(AtomicUsize::new(0));
        let make = |count: &Arc<AtomicUsize>| {
            let c = count.clone();
            Subscription::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
        };

        let serial = SerialSubscription::new();
        serial.replace(make(&count));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        serial.replace(make(&count));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(serial.is_active());

        serial.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(serial.is_disposed());

        serial.replace(make(&count));
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!serial.is_active());
    }
}
