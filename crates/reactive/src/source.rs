//! Change sources.
//!
//! A change source is an ordered collection that publishes a raw
//! [`ChangeEvent`] for every structural edit. Views read it through
//! [`ChangeSource::read`], which holds the source's synchronization handle
//! for the duration of the read. That handle is always the *outer* lock:
//! views take their tracker lock only inside `read`, never the other way
//! round.

use crate::observer::{Callback, Observers, Subscription};
use liveseq_core::{ChangeEvent, Element, Error, Result};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;

/// An ordered collection publishing structural change events.
pub trait ChangeSource<T>: Send + Sync {
    /// Runs `reader` over the current contents while holding the source's
    /// synchronization handle.
    fn read(&self, reader: &mut dyn FnMut(&[T]));

    /// Registers an observer for raw change events.
    fn subscribe(&self, observer: Callback<ChangeEvent<T>>) -> Subscription;

    /// Copies the current contents.
    fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut out = Vec::new();
        self.read(&mut |items| out = items.to_vec());
        out
    }
}

/// A change source that accepts edits.
pub trait MutableSource<T>: ChangeSource<T> {
    /// Appends an item.
    fn push(&self, item: T);

    /// Inserts an item so that it ends up at `index`.
    fn insert(&self, index: usize, item: T) -> Result<()>;

    /// Removes and returns the item at `index`.
    fn remove_at(&self, index: usize) -> Result<T>;

    /// Replaces the item at `index`, returning the previous one.
    fn set(&self, index: usize, item: T) -> Result<T>;

    /// Removes every item.
    fn clear(&self);
}

/// A thread-safe observable list.
///
/// Every edit publishes one raw event while the list's reentrant lock is
/// still held, so observers see events in edit order and may read (or edit)
/// the list from inside their callback.
pub struct ObservableList<T> {
    items: ReentrantMutex<RefCell<Vec<T>>>,
    observers: Observers<ChangeEvent<T>>,
}

impl<T: Element> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> ObservableList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Creates a list with initial contents.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: ReentrantMutex::new(RefCell::new(items)),
            observers: Observers::new(),
        }
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.lock().borrow().len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the item at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.lock().borrow().get(index).cloned()
    }

    /// Returns the position of `item` (by identity).
    pub fn position(&self, item: &T) -> Option<usize> {
        self.items.lock().borrow().iter().position(|x| x.same(item))
    }

    /// Removes the first occurrence of `item` (by identity). Returns true
    /// if it was present.
    pub fn remove(&self, item: &T) -> bool {
        let guard = self.items.lock();
        let index = guard.borrow().iter().position(|x| x.same(item));
        match index {
            Some(index) => self.remove_at(index).is_ok(),
            None => false,
        }
    }

    /// Moves the item at `old_index` to `new_index`.
    pub fn move_item(&self, old_index: usize, new_index: usize) -> Result<()> {
        self.mutate(|items| {
            let len = items.len();
            if old_index >= len || new_index >= len {
                return Err(Error::out_of_bounds(old_index.max(new_index), len));
            }
            let item = items.remove(old_index);
            items.insert(new_index, item.clone());
            Ok(((), ChangeEvent::moved(item, new_index, old_index)))
        })
    }

    /// Replaces the whole contents, publishing a single reset.
    pub fn replace_all(&self, items: Vec<T>) {
        let _ = self.mutate(|current| {
            *current = items;
            Ok(((), ChangeEvent::Reset))
        });
    }

    /// Holds the list's synchronization handle while `f` runs. Edits made
    /// by `f` on this thread are still allowed.
    pub fn synchronized<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.items.lock();
        f()
    }

    /// Returns the number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn mutate<R>(&self, edit: impl FnOnce(&mut Vec<T>) -> Result<(R, ChangeEvent<T>)>) -> Result<R> {
        let guard = self.items.lock();
        let (result, event) = {
            let mut items = guard.borrow_mut();
            edit(&mut items)?
        };
        tracing::trace!(kind = ?event.kind(), "observable list changed");
        self.observers.notify(&event);
        Ok(result)
    }
}

impl<T: Element> ChangeSource<T> for ObservableList<T> {
    fn read(&self, reader: &mut dyn FnMut(&[T])) {
        let guard = self.items.lock();
        let items = guard.borrow();
        reader(&items);
    }

    fn subscribe(&self, observer: Callback<ChangeEvent<T>>) -> Subscription {
        self.observers.subscribe_shared(observer)
    }
}

impl<T: Element> MutableSource<T> for ObservableList<T> {
    fn push(&self, item: T) {
        let _ = self.mutate(|items| {
            items.push(item.clone());
            Ok(((), ChangeEvent::add(item, items.len() - 1)))
        });
    }

    fn insert(&self, index: usize, item: T) -> Result<()> {
        self.mutate(|items| {
            if index > items.len() {
                return Err(Error::out_of_bounds(index, items.len()));
            }
            items.insert(index, item.clone());
            Ok(((), ChangeEvent::add(item, index)))
        })
    }

    fn remove_at(&self, index: usize) -> Result<T> {
        self.mutate(|items| {
            if index >= items.len() {
                return Err(Error::out_of_bounds(index, items.len()));
            }
            let item = items.remove(index);
            Ok((item.clone(), ChangeEvent::remove(item, index)))
        })
    }

    fn set(&self, index: usize, item: T) -> Result<T> {
        self.mutate(|items| {
            if index >= items.len() {
                return Err(Error::out_of_bounds(index, items.len()));
            }
            let old = std::mem::replace(&mut items[index], item.clone());
            Ok((old.clone(), ChangeEvent::replace(item, old, index)))
        })
    }

    fn clear(&self) {
        let _ = self.mutate(|items| {
            items.clear();
            Ok(((), ChangeEvent::Reset))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorder<T: Element>(list: &ObservableList<T>) -> (Arc<Mutex<Vec<ChangeEvent<T>>>>, Subscription) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        let sub = list.subscribe(Arc::new(move |e: &ChangeEvent<T>| l.lock().push(e.clone())));
        (log, sub)
    }

    #[test]
    fn test_edits_publish_events() {
        let list = ObservableList::from_vec(vec![1, 2, 3]);
        let (log, _sub) = recorder(&list);

        list.push(4);
        list.insert(0, 0).unwrap();
        assert_eq!(list.remove_at(2).unwrap(), 2);
        assert_eq!(list.set(0, 9).unwrap(), 0);
        list.move_item(0, 3).unwrap();

        assert_eq!(list.snapshot(), vec![1, 3, 4, 9]);
        assert_eq!(
            *log.lock(),
            vec![
                ChangeEvent::add(4, 3),
                ChangeEvent::add(0, 0),
                ChangeEvent::remove(2, 2),
                ChangeEvent::replace(9, 0, 0),
                ChangeEvent::moved(9, 3, 0),
            ]
        );
    }

    #[test]
    fn test_out_of_bounds_edits_publish_nothing() {
        let list = ObservableList::from_vec(vec![1]);
        let (log, _sub) = recorder(&list);

        assert_eq!(list.insert(5, 2).unwrap_err(), Error::out_of_bounds(5, 1));
        assert!(list.remove_at(1).is_err());
        assert!(list.set(3, 1).is_err());
        assert!(list.move_item(0, 1).is_err());

        assert!(log.lock().is_empty());
        assert_eq!(list.snapshot(), vec![1]);
    }

    #[test]
    fn test_remove_by_identity() {
        let a = Arc::new("a");
        let twin = Arc::new("a");
        let list = ObservableList::from_vec(vec![a.clone()]);

        assert!(!list.remove(&twin));
        assert!(list.remove(&a));
        assert!(list.is_empty());
    }

    #[test]
    fn test_clear_and_replace_all_reset() {
        let list = ObservableList::from_vec(vec![1, 2]);
        let (log, _sub) = recorder(&list);

        list.replace_all(vec![5, 6, 7]);
        list.clear();

        assert_eq!(*log.lock(), vec![ChangeEvent::Reset, ChangeEvent::Reset]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_observer_may_read_during_dispatch() {
        let list = Arc::new(ObservableList::from_vec(vec![1]));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let reader = Arc::downgrade(&list);
        let s = seen.clone();
        let _sub = list.subscribe(Arc::new(move |_: &ChangeEvent<i32>| {
            if let Some(list) = reader.upgrade() {
                s.lock().push(list.snapshot());
            }
        }));

        list.push(2);
        assert_eq!(*seen.lock(), vec![vec![1, 2]]);
    }

    #[test]
    fn test_synchronized_allows_nested_edits() {
        let list = ObservableList::from_vec(vec![1]);
        list.synchronized(|| {
            list.push(2);
            assert_eq!(list.len(), 2);
        });
        assert_eq!(list.get(1), Some(2));
    }
}
