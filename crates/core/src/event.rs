//! Structural change events.
//!
//! A `ChangeEvent` describes one structural edit of an ordered sequence.
//! Indices are interpreted against the sequence as it looks when the event
//! is applied: `Add` inserts so that the item ends up at `index`, `Remove`
//! and `Replace` address the existing slot, and `Move` removes the item at
//! `old_index` and re-inserts it at `new_index`.

use crate::element::Element;
use crate::error::{Error, Result};
use alloc::vec;
use alloc::vec::Vec;

/// Discriminant of a [`ChangeEvent`], without payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Add,
    Remove,
    Replace,
    Move,
    Reset,
}

impl ChangeKind {
    /// Returns true if events of this kind change the element count.
    #[inline]
    pub fn changes_count(self) -> bool {
        matches!(self, ChangeKind::Add | ChangeKind::Remove | ChangeKind::Reset)
    }
}

/// A structural change to an ordered sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeEvent<T> {
    /// `item` was inserted and now lives at `index`.
    Add { item: T, index: usize },
    /// `item` was removed from `index`.
    Remove { item: T, index: usize },
    /// The element at `index` was replaced.
    Replace { new_item: T, old_item: T, index: usize },
    /// `item` moved from `old_index` to `new_index`.
    Move {
        item: T,
        new_index: usize,
        old_index: usize,
    },
    /// The sequence changed too much to describe; consumers re-read it.
    Reset,
}

impl<T> ChangeEvent<T> {
    /// Creates an add event.
    #[inline]
    pub fn add(item: T, index: usize) -> Self {
        ChangeEvent::Add { item, index }
    }

    /// Creates a remove event.
    #[inline]
    pub fn remove(item: T, index: usize) -> Self {
        ChangeEvent::Remove { item, index }
    }

    /// Creates a replace event.
    #[inline]
    pub fn replace(new_item: T, old_item: T, index: usize) -> Self {
        ChangeEvent::Replace {
            new_item,
            old_item,
            index,
        }
    }

    /// Creates a move event.
    #[inline]
    pub fn moved(item: T, new_index: usize, old_index: usize) -> Self {
        ChangeEvent::Move {
            item,
            new_index,
            old_index,
        }
    }

    /// Returns the kind of this event.
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Add { .. } => ChangeKind::Add,
            ChangeEvent::Remove { .. } => ChangeKind::Remove,
            ChangeEvent::Replace { .. } => ChangeKind::Replace,
            ChangeEvent::Move { .. } => ChangeKind::Move,
            ChangeEvent::Reset => ChangeKind::Reset,
        }
    }

    /// Returns true if this is a reset.
    #[inline]
    pub fn is_reset(&self) -> bool {
        matches!(self, ChangeEvent::Reset)
    }

    /// Returns the elements this event touches (new item first for replace).
    pub fn items(&self) -> Vec<&T> {
        match self {
            ChangeEvent::Add { item, .. }
            | ChangeEvent::Remove { item, .. }
            | ChangeEvent::Move { item, .. } => vec![item],
            ChangeEvent::Replace {
                new_item, old_item, ..
            } => vec![new_item, old_item],
            ChangeEvent::Reset => Vec::new(),
        }
    }

    /// Maps the payload to a new type, keeping indices.
    pub fn map<U, F>(self, mut f: F) -> ChangeEvent<U>
    where
        F: FnMut(T) -> U,
    {
        match self {
            ChangeEvent::Add { item, index } => ChangeEvent::Add {
                item: f(item),
                index,
            },
            ChangeEvent::Remove { item, index } => ChangeEvent::Remove {
                item: f(item),
                index,
            },
            ChangeEvent::Replace {
                new_item,
                old_item,
                index,
            } => ChangeEvent::Replace {
                new_item: f(new_item),
                old_item: f(old_item),
                index,
            },
            ChangeEvent::Move {
                item,
                new_index,
                old_index,
            } => ChangeEvent::Move {
                item: f(item),
                new_index,
                old_index,
            },
            ChangeEvent::Reset => ChangeEvent::Reset,
        }
    }
}

impl<T: Element> ChangeEvent<T> {
    /// Applies this event to `target` in place.
    ///
    /// Fails with `IndexOutOfBounds` without modifying `target` if an index
    /// does not fit, or if the element at the addressed slot is not the one
    /// the event names. `Reset` carries no data and is rejected as
    /// unsupported; callers re-read the source instead.
    pub fn apply_to(&self, target: &mut Vec<T>) -> Result<()> {
        let len = target.len();
        match self {
            ChangeEvent::Add { item, index } => {
                if *index > len {
                    return Err(Error::out_of_bounds(*index, len));
                }
                target.insert(*index, item.clone());
            }
            ChangeEvent::Remove { item, index } => {
                if *index >= len || !target[*index].same(item) {
                    return Err(Error::out_of_bounds(*index, len));
                }
                target.remove(*index);
            }
            ChangeEvent::Replace {
                new_item,
                old_item,
                index,
            } => {
                if *index >= len || !target[*index].same(old_item) {
                    return Err(Error::out_of_bounds(*index, len));
                }
                target[*index] = new_item.clone();
            }
            ChangeEvent::Move {
                item,
                new_index,
                old_index,
            } => {
                if *old_index >= len || *new_index >= len || !target[*old_index].same(item) {
                    return Err(Error::out_of_bounds((*old_index).max(*new_index), len));
                }
                let moved = target.remove(*old_index);
                target.insert(*new_index, moved);
            }
            ChangeEvent::Reset => return Err(Error::unsupported("apply reset")),
        }
        Ok(())
    }
}

/// An ordered list of change events produced by one diff or buffering cycle.
pub type Batch<T> = Vec<ChangeEvent<T>>;

/// Extension trait for working with batches.
pub trait BatchExt<T> {
    /// Returns true if the batch is empty or only describes nothing.
    fn is_noop(&self) -> bool;

    /// Returns true if any event in the batch is a reset.
    fn has_reset(&self) -> bool;

    /// Collapses the batch to what subscribers observe: nothing, the single
    /// event, or one reset.
    fn collapse(self) -> Option<ChangeEvent<T>>;
}

impl<T> BatchExt<T> for Batch<T> {
    fn is_noop(&self) -> bool {
        self.is_empty()
    }

    fn has_reset(&self) -> bool {
        self.iter().any(ChangeEvent::is_reset)
    }

    fn collapse(mut self) -> Option<ChangeEvent<T>> {
        match self.len() {
            0 => None,
            1 => self.pop(),
            _ => Some(ChangeEvent::Reset),
        }
    }
}
