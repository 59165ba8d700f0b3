//! liveseq Incremental - Snapshot diffing and memoized element mapping.
//!
//! This crate holds the two pure building blocks behind every live view:
//!
//! - `changes`: Computes the events turning one ordered snapshot into
//!   another, pinpointing single adds, removes, replaces and moves and
//!   falling back to `Reset` for anything larger
//! - `MappingCache`: Memoizes a source-to-derived element selector by source
//!   identity, with optional index updates and disposal tracking
//!
//! # Example
//!
//! ```
//! use liveseq_core::ChangeEvent;
//! use liveseq_incremental::{changes, MappingCache, Selector};
//! use std::sync::Arc;
//!
//! let batch = changes(&[1, 2, 3], &[1, 3]);
//! assert_eq!(batch, vec![ChangeEvent::remove(2, 1)]);
//!
//! let mut cache = MappingCache::new(Selector::plain(|s: &Arc<i32>| Arc::new(**s * 2)));
//! let source = Arc::new(21);
//! let first = cache.get_or_create(&source, 0).unwrap();
//! let second = cache.get_or_create(&source, 0).unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//! ```

#![no_std]

extern crate alloc;

pub mod diff;
pub mod mapping;

pub use diff::{changes, changes_with_hint};
pub use mapping::{IndexUpdater, MappingCache, Selector};
