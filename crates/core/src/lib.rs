//! liveseq Core - Change events, element identity and errors shared by all
//! liveseq crates.
//!
//! This crate provides the vocabulary the diff engine and the live views
//! speak:
//!
//! - `ChangeEvent`: One structural edit (add, remove, replace, move, reset)
//! - `Batch`: The ordered events produced by one diff or buffering cycle
//! - `Element`: Identity contract deciding when two elements are "the same"
//! - `Disposable`: Optional release-on-removal contract for derived elements
//! - `Error`: Error types for view and mapping operations
//!
//! # Example
//!
//! ```rust
//! use liveseq_core::{ChangeEvent, Element};
//! use std::sync::Arc;
//!
//! let mut items = vec![1, 2, 3];
//! ChangeEvent::add(4, 3).apply_to(&mut items).unwrap();
//! assert_eq!(items, vec![1, 2, 3, 4]);
//!
//! // Shared elements compare by identity, not by value.
//! let a = Arc::new("row");
//! let b = Arc::new("row");
//! assert!(!a.same(&b));
//! ```

#![no_std]

extern crate alloc;

mod element;
mod error;
mod event;

pub use element::{Disposable, Element, Identity};
pub use error::{Error, Result};
pub use event::{Batch, BatchExt, ChangeEvent, ChangeKind};
