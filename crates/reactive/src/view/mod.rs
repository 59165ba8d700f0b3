//! Live views.
//!
//! Every view owns a [`ViewCore`]: the snapshot tracker consumers read, the
//! notifier they subscribe to, and the single upstream pipeline slot. Views
//! differ only in how a pipeline batch turns into a new snapshot.
//!
//! | View | Projection | Editable |
//! |------|------------|----------|
//! | [`FilteredView`] | predicate | yes, with index translation |
//! | [`MappedView`] | selector over a mapping cache | no |
//! | [`ThrottledView`] | identity, debounced | yes |
//! | [`DeferredView`] | identity, deferrable | yes |
//! | [`SerialView`] | identity over a swappable source | no |

mod deferred;
mod filtered;
mod mapped;
mod serial;
mod throttled;

pub use deferred::{DeferredView, DeferredViewBuilder};
pub use filtered::{FilteredView, FilteredViewBuilder, Predicate};
pub use mapped::{MappedView, MappedViewBuilder};
pub use serial::SerialView;
pub use throttled::{ThrottledView, ThrottledViewBuilder};

use crate::notify::{Notifier, Property};
use crate::observer::{SerialSubscription, Subscription};
use crate::refresher::{Refresher, RefresherConfig};
use crate::scheduler::SharedScheduler;
use crate::source::{ChangeSource, MutableSource};
use crate::tracker::SnapshotTracker;
use liveseq_core::{ChangeEvent, Element, Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Read access to a live view.
///
/// Every operation on a disposed view fails with `Error::Disposed`.
pub trait LiveView<T: Element>: Send + Sync {
    #[doc(hidden)]
    fn core(&self) -> &ViewCore<T>;

    /// Returns a copy of the current snapshot.
    fn current(&self) -> Result<Vec<T>> {
        self.core().tracker.current()
    }

    fn len(&self) -> Result<usize> {
        self.core().tracker.len()
    }

    fn is_empty(&self) -> Result<bool> {
        self.core().tracker.is_empty()
    }

    fn get(&self, index: usize) -> Result<Option<T>> {
        self.core().tracker.get(index)
    }

    fn contains(&self, item: &T) -> Result<bool> {
        self.core().tracker.contains(item)
    }

    fn index_of(&self, item: &T) -> Result<Option<usize>> {
        self.core().tracker.index_of(item)
    }

    /// Copies the snapshot into `target` at `offset`.
    fn copy_to(&self, target: &mut [T], offset: usize) -> Result<usize> {
        self.core().tracker.copy_to(target, offset)
    }

    /// Registers a collection-changed observer.
    fn subscribe_collection<F>(&self, observer: F) -> Result<Subscription>
    where
        F: Fn(&ChangeEvent<T>) + Send + Sync + 'static,
        Self: Sized,
    {
        self.core().ensure_live()?;
        Ok(self.core().notifier.subscribe_collection(observer))
    }

    /// Registers a property-changed observer.
    fn subscribe_property<F>(&self, observer: F) -> Result<Subscription>
    where
        F: Fn(&Property) + Send + Sync + 'static,
        Self: Sized,
    {
        self.core().ensure_live()?;
        Ok(self.core().notifier.subscribe_property(observer))
    }

    /// Stops observing the source and releases the snapshot. Idempotent.
    fn dispose(&self) {
        self.core().dispose();
    }

    fn is_disposed(&self) -> bool {
        self.core().is_disposed()
    }
}

/// State shared by every view.
pub struct ViewCore<T> {
    name: &'static str,
    tracker: SnapshotTracker<T>,
    notifier: Notifier<T>,
    pipeline: SerialSubscription,
    disposed: AtomicBool,
}

impl<T: Element> ViewCore<T> {
    fn new(name: &'static str, scheduler: Option<SharedScheduler>) -> Self {
        Self {
            name,
            tracker: SnapshotTracker::default(),
            notifier: Notifier::new(scheduler),
            pipeline: SerialSubscription::new(),
            disposed: AtomicBool::new(false),
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(Error::disposed(self.name))
        } else {
            Ok(())
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Returns true on the call that actually disposed.
    fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.pipeline.dispose();
        self.tracker.clear();
        self.notifier.clear();
        tracing::debug!(view = self.name, "view disposed");
        true
    }

    /// Mirrors `source` into the snapshot, publishing `hint` if it explains
    /// the change.
    fn mirror<S>(&self, source: &S, hint: &[ChangeEvent<T>])
    where
        S: ChangeSource<T> + ?Sized,
    {
        let mut outcome = Ok(());
        source.read(&mut |items| {
            outcome = self.tracker.reconcile(items.to_vec(), hint, &self.notifier).map(drop);
        });
        self.report(outcome);
    }

    fn report(&self, outcome: Result<()>) {
        if let Err(err) = outcome {
            tracing::debug!(view = self.name, error = %err, "view update skipped");
        }
    }
}

fn pipeline_config(
    buffer_time: Duration,
    signal_initial: bool,
    scheduler: Option<&SharedScheduler>,
) -> RefresherConfig {
    let config = RefresherConfig::new()
        .with_buffer_time(buffer_time)
        .with_signal_initial(signal_initial);
    match scheduler {
        Some(scheduler) => config.with_scheduler(scheduler.clone()),
        None => config,
    }
}

/// An identity projection of a source: the state behind the throttled and
/// deferred views.
struct Mirror<T, S> {
    core: ViewCore<T>,
    source: Arc<S>,
    scheduler: Option<SharedScheduler>,
}

impl<T, S> Mirror<T, S>
where
    T: Element,
    S: ChangeSource<T> + 'static,
{
    fn new(name: &'static str, source: Arc<S>, scheduler: Option<SharedScheduler>) -> Arc<Self> {
        Arc::new(Self {
            core: ViewCore::new(name, scheduler.clone()),
            source,
            scheduler,
        })
    }

    /// Subscribes `this` to `refresher`, replacing the previous pipeline.
    fn attach(this: &Arc<Self>, refresher: &Refresher<T>) {
        let weak = Arc::downgrade(this);
        let subscription = refresher.subscribe(move |batch| {
            if let Some(mirror) = weak.upgrade() {
                mirror.core.mirror(&*mirror.source, batch);
            }
        });
        this.core.pipeline.replace(subscription);
    }

    fn refresher(&self, buffer_time: Duration, signal_initial: bool) -> Refresher<T> {
        let source: Arc<dyn ChangeSource<T>> = self.source.clone();
        let config = pipeline_config(buffer_time, signal_initial, self.scheduler.as_ref());
        Refresher::new(source, Vec::new(), config)
    }

    fn resync(&self) {
        self.core.mirror(&*self.source, &[]);
    }
}

impl<T, S> Mirror<T, S>
where
    T: Element,
    S: MutableSource<T> + 'static,
{
    fn push(&self, item: T) -> Result<()> {
        self.core.ensure_live()?;
        self.source.push(item);
        Ok(())
    }

    fn insert(&self, index: usize, item: T) -> Result<()> {
        self.core.ensure_live()?;
        self.source.insert(index, item)
    }

    fn remove(&self, item: &T) -> Result<bool> {
        self.core.ensure_live()?;
        match source_position(&*self.source, item) {
            Some(index) => self.source.remove_at(index).map(|_| true),
            None => Ok(false),
        }
    }

    fn remove_at(&self, index: usize) -> Result<T> {
        self.core.ensure_live()?;
        self.source.remove_at(index)
    }

    fn set(&self, index: usize, item: T) -> Result<T> {
        self.core.ensure_live()?;
        self.source.set(index, item)
    }
}

fn source_position<T, S>(source: &S, item: &T) -> Option<usize>
where
    T: Element,
    S: ChangeSource<T> + ?Sized,
{
    let mut position = None;
    source.read(&mut |items| position = items.iter().position(|x| x.same(item)));
    position
}
