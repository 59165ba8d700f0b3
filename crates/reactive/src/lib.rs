//! Liveseq Reactive - live views over observable lists.
//!
//! This crate keeps derived collections (filtered, mapped, debounced,
//! deferred, swappable) in sync with an observable source and publishes
//! the minimal change notification for every update.
//!
//! # Core Concepts
//!
//! - `ChangeSource`: an ordered collection publishing raw change events
//! - `Refresher`: buffers raw events and triggers into batches
//! - `SnapshotTracker`: a view's private snapshot, updated by diffing
//! - `Notifier`: publishes collection and property notifications
//! - `LiveView`: read access shared by every view
//!
//! # Example
//!
//! ```
//! use liveseq_reactive::{FilteredView, LiveView, MutableSource, ObservableList};
//! use std::sync::Arc;
//!
//! let list = Arc::new(ObservableList::from_vec(vec![1, 2, 3, 4]));
//! let evens = FilteredView::builder()
//!     .source(list.clone())
//!     .predicate(|x: &i32| x % 2 == 0)
//!     .build()
//!     .unwrap();
//!
//! let _sub = evens
//!     .subscribe_collection(|event| println!("{:?}", event))
//!     .unwrap();
//!
//! list.push(6);
//! assert_eq!(evens.current().unwrap(), vec![2, 4, 6]);
//! ```

pub mod notify;
pub mod observer;
pub mod refresher;
pub mod scheduler;
pub mod source;
pub mod tracker;
pub mod trigger;
pub mod view;

pub use notify::{Notifier, Property};
pub use observer::{Callback, Observers, SerialSubscription, Subscription, SubscriptionId};
pub use refresher::{DeferScope, Refresher, RefresherConfig};
pub use scheduler::{ImmediateScheduler, Scheduler, SharedScheduler, Task, VirtualScheduler};
pub use source::{ChangeSource, MutableSource, ObservableList};
pub use tracker::SnapshotTracker;
pub use trigger::Trigger;
pub use view::{
    DeferredView, DeferredViewBuilder, FilteredView, FilteredViewBuilder, LiveView, MappedView,
    MappedViewBuilder, Predicate, SerialView, ThrottledView, ThrottledViewBuilder, ViewCore,
};

// Re-export commonly used types from dependencies
pub use liveseq_core::{Batch, ChangeEvent, ChangeKind, Disposable, Element, Error, Result};
pub use liveseq_incremental::{changes, MappingCache, Selector};
