//! Filtered projection.

use super::{pipeline_config, source_position, LiveView, ViewCore};
use crate::observer::Subscription;
use crate::refresher::Refresher;
use crate::scheduler::SharedScheduler;
use crate::source::{ChangeSource, MutableSource};
use crate::trigger::Trigger;
use liveseq_core::{Batch, Element, Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Element predicate.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

struct FilterSettings<T> {
    predicate: Predicate<T>,
    buffer_time: Duration,
    triggers: Vec<Trigger>,
}

struct FilteredInner<T, S> {
    core: ViewCore<T>,
    source: Arc<S>,
    scheduler: Option<SharedScheduler>,
    settings: Mutex<FilterSettings<T>>,
}

/// The elements of a source that satisfy a predicate, in source order.
///
/// A single raw event whose elements all fail the predicate is dropped
/// without recomputing. Everything else re-filters the source and publishes
/// the diff against the previous snapshot.
pub struct FilteredView<T, S> {
    inner: Arc<FilteredInner<T, S>>,
}

impl<T, S> FilteredView<T, S>
where
    T: Element,
    S: ChangeSource<T> + 'static,
{
    pub fn builder() -> FilteredViewBuilder<T, S> {
        FilteredViewBuilder::default()
    }

    /// Returns the source being filtered.
    pub fn source(&self) -> &Arc<S> {
        &self.inner.source
    }

    /// Replaces the predicate and re-filters.
    pub fn set_predicate<F>(&self, predicate: F) -> Result<()>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.reconfigure(|settings| settings.predicate = Arc::new(predicate))
    }

    /// Replaces the debounce window.
    pub fn set_buffer_time(&self, buffer_time: Duration) -> Result<()> {
        self.reconfigure(|settings| settings.buffer_time = buffer_time)
    }

    /// Replaces the recompute triggers.
    pub fn set_triggers(&self, triggers: Vec<Trigger>) -> Result<()> {
        self.reconfigure(|settings| settings.triggers = triggers)
    }

    pub fn buffer_time(&self) -> Duration {
        self.inner.settings.lock().buffer_time
    }

    fn reconfigure(&self, change: impl FnOnce(&mut FilterSettings<T>)) -> Result<()> {
        self.inner.core.ensure_live()?;
        change(&mut self.inner.settings.lock());
        tracing::debug!(view = "FilteredView", "reconfigured");
        FilteredInner::start(&self.inner, true);
        Ok(())
    }
}

impl<T, S> FilteredInner<T, S>
where
    T: Element,
    S: ChangeSource<T> + 'static,
{
    fn start(this: &Arc<Self>, signal_initial: bool) {
        let (triggers, buffer_time) = {
            let settings = this.settings.lock();
            (settings.triggers.clone(), settings.buffer_time)
        };
        let source: Arc<dyn ChangeSource<T>> = this.source.clone();
        let config = pipeline_config(buffer_time, signal_initial, this.scheduler.as_ref());
        let refresher = Refresher::new(source, triggers, config);

        let weak = Arc::downgrade(this);
        let subscription: Subscription = refresher.subscribe(move |batch| {
            if let Some(inner) = weak.upgrade() {
                inner.on_batch(batch);
            }
        });
        this.core.pipeline.replace(subscription);
    }

    fn on_batch(&self, batch: &Batch<T>) {
        let predicate = self.settings.lock().predicate.clone();
        if let [event] = batch.as_slice() {
            if !event.is_reset() && event.items().into_iter().all(|item| !predicate(item)) {
                tracing::trace!(kind = ?event.kind(), "filtered view skipped irrelevant event");
                return;
            }
        }
        self.refilter(&predicate);
    }

    fn refilter(&self, predicate: &Predicate<T>) {
        let mut outcome = Ok(());
        self.source.read(&mut |items| {
            let filtered: Vec<T> = items.iter().filter(|item| predicate(*item)).cloned().collect();
            outcome = self.core.tracker.reset(filtered, &self.core.notifier).map(drop);
        });
        self.core.report(outcome);
    }
}

impl<T, S> FilteredView<T, S>
where
    T: Element,
    S: MutableSource<T> + 'static,
{
    /// Appends `item` to the source.
    pub fn push(&self, item: T) -> Result<()> {
        self.inner.core.ensure_live()?;
        self.inner.source.push(item);
        Ok(())
    }

    /// Inserts `item` into the source in front of the element currently at
    /// filtered position `index`, or appends it when `index` equals the
    /// view's length.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        let core = &self.inner.core;
        let len = core.tracker.len()?;
        if index > len {
            return Err(Error::out_of_bounds(index, len));
        }
        match core.tracker.get(index)? {
            Some(anchor) => {
                let position = self.source_index(&anchor, index, len)?;
                self.inner.source.insert(position, item)
            }
            None => {
                self.inner.source.push(item);
                Ok(())
            }
        }
    }

    /// Removes `item` from the source if the view contains it.
    pub fn remove(&self, item: &T) -> Result<bool> {
        if !self.inner.core.tracker.contains(item)? {
            return Ok(false);
        }
        match source_position(&*self.inner.source, item) {
            Some(position) => self.inner.source.remove_at(position).map(|_| true),
            None => Ok(false),
        }
    }

    /// Removes the element at filtered position `index` from the source.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        let (anchor, len) = self.anchor(index)?;
        let position = self.source_index(&anchor, index, len)?;
        self.inner.source.remove_at(position)
    }

    /// Replaces the element at filtered position `index` in the source.
    pub fn set(&self, index: usize, item: T) -> Result<T> {
        let (anchor, len) = self.anchor(index)?;
        let position = self.source_index(&anchor, index, len)?;
        self.inner.source.set(position, item)
    }

    fn anchor(&self, index: usize) -> Result<(T, usize)> {
        let core = &self.inner.core;
        let len = core.tracker.len()?;
        let anchor = core.tracker.get(index)?.ok_or(Error::out_of_bounds(index, len))?;
        Ok((anchor, len))
    }

    /// Maps filtered position `index` to a source position: the `index`-th
    /// source element passing the predicate, provided it is `anchor`. A
    /// snapshot lagging behind the source falls back to the first source
    /// element that is `anchor`.
    fn source_index(&self, anchor: &T, index: usize, len: usize) -> Result<usize> {
        let predicate = self.inner.settings.lock().predicate.clone();
        let mut counted = None;
        self.inner.source.read(&mut |items| {
            counted = items
                .iter()
                .enumerate()
                .filter(|(_, item)| predicate(*item))
                .nth(index)
                .filter(|(_, item)| item.same(anchor))
                .map(|(position, _)| position);
        });
        counted
            .or_else(|| source_position(&*self.inner.source, anchor))
            .ok_or(Error::out_of_bounds(index, len))
    }
}

impl<T, S> LiveView<T> for FilteredView<T, S>
where
    T: Element,
    S: ChangeSource<T> + 'static,
{
    fn core(&self) -> &ViewCore<T> {
        &self.inner.core
    }
}

/// Builder for [`FilteredView`].
pub struct FilteredViewBuilder<T, S> {
    source: Option<Arc<S>>,
    predicate: Option<Predicate<T>>,
    buffer_time: Duration,
    triggers: Vec<Trigger>,
    scheduler: Option<SharedScheduler>,
}

impl<T, S> Default for FilteredViewBuilder<T, S> {
    fn default() -> Self {
        Self {
            source: None,
            predicate: None,
            buffer_time: Duration::ZERO,
            triggers: Vec::new(),
            scheduler: None,
        }
    }
}

impl<T, S> FilteredViewBuilder<T, S>
where
    T: Element,
    S: ChangeSource<T> + 'static,
{
    pub fn source(mut self, source: Arc<S>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn buffer_time(mut self, buffer_time: Duration) -> Self {
        self.buffer_time = buffer_time;
        self
    }

    /// Adds a recompute trigger.
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Times debouncing and marshals collection notifications.
    pub fn scheduler(mut self, scheduler: SharedScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Builds the view and computes its initial snapshot.
    pub fn build(self) -> Result<FilteredView<T, S>> {
        let source = self.source.ok_or(Error::missing_argument("source"))?;
        let predicate = self.predicate.ok_or(Error::missing_argument("predicate"))?;

        let inner = Arc::new(FilteredInner {
            core: ViewCore::new("FilteredView", self.scheduler.clone()),
            source,
            scheduler: self.scheduler,
            settings: Mutex::new(FilterSettings {
                predicate: predicate.clone(),
                buffer_time: self.buffer_time,
                triggers: self.triggers,
            }),
        });
        FilteredInner::start(&inner, false);
        inner.refilter(&predicate);
        Ok(FilteredView { inner })
    }
}
