//! Synchronized snapshot tracking.
//!
//! `SnapshotTracker` owns the private snapshot behind a view. Updates replace
//! (or patch) the snapshot and compute the resulting events while holding
//! the tracker's write lock; the events are handed to the view's
//! [`Notifier`] right after the lock is released. Reads share the lock and
//! only hold it for the copy or comparison they perform.
//!
//! # Lock ordering
//!
//! When an update is derived from a change source, the caller computes it
//! inside [`ChangeSource::read`](crate::source::ChangeSource::read), so the
//! source's handle is taken first and the tracker lock second. Nothing in
//! this crate takes them in the opposite order.

use crate::notify::Notifier;
use liveseq_core::{Batch, ChangeEvent, Element, Error, Result};
use liveseq_incremental::{changes, changes_with_hint};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// The snapshot behind a live view.
pub struct SnapshotTracker<T> {
    current: RwLock<Vec<T>>,
    disposed: AtomicBool,
}

impl<T: Element> Default for SnapshotTracker<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Element> SnapshotTracker<T> {
    /// Creates a tracker holding `initial`.
    pub fn new(initial: Vec<T>) -> Self {
        Self {
            current: RwLock::new(initial),
            disposed: AtomicBool::new(false),
        }
    }

    /// Replaces the snapshot with `updated`, diffs it against the previous
    /// snapshot and publishes the result. Returns the computed batch.
    pub fn reset(&self, updated: Vec<T>, notifier: &Notifier<T>) -> Result<Batch<T>> {
        self.refresh(updated, None, notifier)
    }

    /// Replaces the snapshot with `updated` and publishes `batch`.
    ///
    /// A supplied batch is trusted and published as-is; with `None` the
    /// batch is computed by diffing against the previous snapshot.
    pub fn refresh(
        &self,
        updated: Vec<T>,
        batch: Option<Batch<T>>,
        notifier: &Notifier<T>,
    ) -> Result<Batch<T>> {
        let batch = {
            let mut current = self.current.write();
            self.ensure_live()?;
            let batch = match batch {
                Some(batch) => batch,
                None => changes(&current, &updated),
            };
            *current = updated;
            batch
        };
        notifier.notify(batch.clone());
        Ok(batch)
    }

    /// Replaces the snapshot with `updated`, publishing `hint` when it
    /// provably explains the change and a computed diff otherwise.
    pub fn reconcile(
        &self,
        updated: Vec<T>,
        hint: &[ChangeEvent<T>],
        notifier: &Notifier<T>,
    ) -> Result<Batch<T>> {
        let batch = {
            let mut current = self.current.write();
            self.ensure_live()?;
            let batch = changes_with_hint(&current, &updated, hint);
            *current = updated;
            batch
        };
        notifier.notify(batch.clone());
        Ok(batch)
    }

    /// Applies a single structural event to the snapshot and publishes it.
    ///
    /// An event that does not fit the snapshot leaves it untouched and fails
    /// with `IndexOutOfBounds`, so the caller can fall back to a reset.
    pub fn patch(&self, event: ChangeEvent<T>, notifier: &Notifier<T>) -> Result<()> {
        {
            let mut current = self.current.write();
            self.ensure_live()?;
            event.apply_to(&mut current)?;
        }
        notifier.notify_event(event);
        Ok(())
    }

    /// Returns a copy of the snapshot.
    pub fn current(&self) -> Result<Vec<T>> {
        self.read(|items| items.to_vec())
    }

    /// Returns the number of elements.
    pub fn len(&self) -> Result<usize> {
        self.read(|items| items.len())
    }

    /// Returns true if the snapshot is empty.
    pub fn is_empty(&self) -> Result<bool> {
        self.read(|items| items.is_empty())
    }

    /// Returns the element at `index`.
    pub fn get(&self, index: usize) -> Result<Option<T>> {
        self.read(|items| items.get(index).cloned())
    }

    /// Returns true if `item` is in the snapshot (by identity).
    pub fn contains(&self, item: &T) -> Result<bool> {
        self.read(|items| items.iter().any(|x| x.same(item)))
    }

    /// Returns the position of `item` in the snapshot (by identity).
    pub fn index_of(&self, item: &T) -> Result<Option<usize>> {
        self.read(|items| items.iter().position(|x| x.same(item)))
    }

    /// Copies the snapshot into `target` starting at `offset`. Returns the
    /// number of copied elements.
    pub fn copy_to(&self, target: &mut [T], offset: usize) -> Result<usize> {
        self.read(|items| {
            let end = offset
                .checked_add(items.len())
                .filter(|end| *end <= target.len())
                .ok_or_else(|| Error::out_of_bounds(offset.saturating_add(items.len()), target.len()))?;
            target[offset..end].clone_from_slice(items);
            Ok(items.len())
        })?
    }

    /// Drops the snapshot. Every later operation fails with `Disposed`.
    pub fn clear(&self) {
        let mut current = self.current.write();
        self.disposed.store(true, Ordering::Release);
        current.clear();
    }

    /// Returns true once [`clear`](Self::clear) has run.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R> {
        let current = self.current.read();
        self.ensure_live()?;
        Ok(f(&current))
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(Error::disposed("SnapshotTracker"))
        } else {
            Ok(())
        }
    }
}
