//! Projection through a mapping cache.

use super::{pipeline_config, LiveView, ViewCore};
use crate::refresher::Refresher;
use crate::scheduler::SharedScheduler;
use crate::source::ChangeSource;
use liveseq_core::{Batch, ChangeEvent, Disposable, Element, Error, Result};
use liveseq_incremental::{IndexUpdater, MappingCache, Selector};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct MappedInner<S, U, Src> {
    core: ViewCore<U>,
    source: Arc<Src>,
    cache: Mutex<MappingCache<S, U>>,
    /// Source elements the snapshot was derived from. Keeps every cached
    /// source alive until the cache has been swept, so no address can be
    /// reused while it is still a cache key.
    derived_from: Mutex<Vec<S>>,
}

/// A read-only projection of a source through a selector.
///
/// Derived values are cached by source identity, so an element keeps its
/// derived value for as long as it stays in the source. Single raw events
/// are patched into the snapshot directly when no index updater is
/// configured; anything else re-derives the whole snapshot.
pub struct MappedView<S, U, Src> {
    inner: Arc<MappedInner<S, U, Src>>,
}

impl<S, U, Src> MappedView<S, U, Src>
where
    S: Element,
    U: Element,
    Src: ChangeSource<S> + 'static,
{
    pub fn builder() -> MappedViewBuilder<S, U, Src> {
        MappedViewBuilder::default()
    }

    pub fn source(&self) -> &Arc<Src> {
        &self.inner.source
    }

    /// Returns the number of cached derived values.
    pub fn cached(&self) -> usize {
        self.inner.cache.lock().len()
    }
}

impl<S, U, Src> MappedInner<S, U, Src>
where
    S: Element,
    U: Element,
    Src: ChangeSource<S> + 'static,
{
    fn on_batch(&self, batch: &Batch<S>) {
        if let [event] = batch.as_slice() {
            if !event.is_reset() && !self.cache.lock().has_updater() {
                match self.patch(event) {
                    Ok(()) => return,
                    Err(err) if err.is_disposed() => return,
                    Err(err) => {
                        tracing::warn!(error = %err, kind = ?event.kind(), "mapped view patch failed; re-deriving");
                    }
                }
            }
        }
        self.rederive();
    }

    fn patch(&self, event: &ChangeEvent<S>) -> Result<()> {
        let core = &self.core;
        let mut cache = self.cache.lock();
        let mut derived_from = self.derived_from.lock();
        match event {
            ChangeEvent::Add { item, index } => {
                let derived = cache.get_or_create(item, *index)?;
                core.tracker.patch(ChangeEvent::add(derived, *index), &core.notifier)?;
                derived_from.insert(*index, item.clone());
            }
            ChangeEvent::Remove { item, index } => {
                let shown = self.shown(&derived_from, item, *index)?;
                core.tracker.patch(ChangeEvent::remove(shown.clone(), *index), &core.notifier)?;
                derived_from.remove(*index);
                cache.evict(item, &shown, &derived_from);
            }
            ChangeEvent::Replace { new_item, old_item, index } => {
                let old = self.shown(&derived_from, old_item, *index)?;
                let new = cache.get_or_create(new_item, *index)?;
                core.tracker.patch(ChangeEvent::replace(new, old.clone(), *index), &core.notifier)?;
                derived_from[*index] = new_item.clone();
                cache.evict(old_item, &old, &derived_from);
            }
            ChangeEvent::Move { item, new_index, old_index } => {
                let derived = self.shown(&derived_from, item, *old_index)?;
                core.tracker.patch(ChangeEvent::moved(derived, *new_index, *old_index), &core.notifier)?;
                let moved = derived_from.remove(*old_index);
                derived_from.insert(*new_index, moved);
            }
            ChangeEvent::Reset => return Err(Error::unsupported("patch reset")),
        }
        Ok(())
    }

    /// Returns the derived value shown for `item` at `index`.
    fn shown(&self, derived_from: &[S], item: &S, index: usize) -> Result<U> {
        let source = derived_from
            .get(index)
            .ok_or(Error::out_of_bounds(index, derived_from.len()))?;
        if !source.same(item) {
            return Err(Error::unsupported("patch against a stale snapshot"));
        }
        self.core
            .tracker
            .get(index)?
            .ok_or(Error::out_of_bounds(index, derived_from.len()))
    }

    fn rederive(&self) {
        let mut outcome = Ok(());
        self.source.read(&mut |items| outcome = self.derive_all(items));
        self.core.report(outcome);
    }

    fn derive_all(&self, items: &[S]) -> Result<()> {
        let core = &self.core;
        let mut cache = self.cache.lock();
        let derived = items
            .iter()
            .enumerate()
            .map(|(index, item)| cache.get_or_create(item, index))
            .collect::<Result<Vec<U>>>()?;
        core.tracker.reset(derived.clone(), &core.notifier)?;

        let evicted = cache.retain_live(items) + cache.retain_detached(&derived);
        let previous = std::mem::replace(&mut *self.derived_from.lock(), items.to_vec());
        drop(cache);
        drop(previous);
        if evicted > 0 {
            tracing::trace!(evicted, "mapped view evicted derived values");
        }
        Ok(())
    }

    fn dispose(&self) {
        if !self.core.dispose() {
            return;
        }
        match self.cache.lock().dispose() {
            Ok(released) => tracing::debug!(released, "mapping cache disposed"),
            Err(err) => tracing::debug!(error = %err, "mapping cache already disposed"),
        }
        self.derived_from.lock().clear();
    }
}

impl<S, U, Src> LiveView<U> for MappedView<S, U, Src>
where
    S: Element,
    U: Element,
    Src: ChangeSource<S> + 'static,
{
    fn core(&self) -> &ViewCore<U> {
        &self.inner.core
    }

    /// Also disposes every cached derived value.
    fn dispose(&self) {
        self.inner.dispose();
    }
}

/// Builder for [`MappedView`].
pub struct MappedViewBuilder<S, U, Src> {
    source: Option<Arc<Src>>,
    selector: Option<Selector<S, U>>,
    updater: Option<IndexUpdater<S, U>>,
    disposal: Option<fn(MappingCache<S, U>) -> MappingCache<S, U>>,
    buffer_time: Duration,
    scheduler: Option<SharedScheduler>,
}

impl<S, U, Src> Default for MappedViewBuilder<S, U, Src> {
    fn default() -> Self {
        Self {
            source: None,
            selector: None,
            updater: None,
            disposal: None,
            buffer_time: Duration::ZERO,
            scheduler: None,
        }
    }
}

impl<S, U, Src> MappedViewBuilder<S, U, Src>
where
    S: Element,
    U: Element,
    Src: ChangeSource<S> + 'static,
{
    pub fn source(mut self, source: Arc<Src>) -> Self {
        self.source = Some(source);
        self
    }

    /// Derives each element from its source element alone.
    pub fn selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&S) -> U + Send + Sync + 'static,
    {
        self.selector = Some(Selector::plain(selector));
        self
    }

    /// Derives each element from its source element and position.
    pub fn indexed_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&S, usize) -> U + Send + Sync + 'static,
    {
        self.selector = Some(Selector::indexed(selector));
        self
    }

    /// Re-derives position-dependent state on every lookup.
    pub fn index_updater<F>(mut self, updater: F) -> Self
    where
        F: Fn(&S, &U, usize) -> U + Send + Sync + 'static,
    {
        self.updater = Some(Arc::new(updater));
        self
    }

    pub fn buffer_time(mut self, buffer_time: Duration) -> Self {
        self.buffer_time = buffer_time;
        self
    }

    pub fn scheduler(mut self, scheduler: SharedScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> Result<MappedView<S, U, Src>> {
        let source = self.source.ok_or(Error::missing_argument("source"))?;
        let selector = self.selector.ok_or(Error::missing_argument("selector"))?;

        let mut cache = MappingCache::new(selector);
        if let Some(updater) = self.updater {
            cache = cache.with_shared_updater(updater);
        }
        if let Some(enable) = self.disposal {
            cache = enable(cache);
        }

        let inner = Arc::new(MappedInner {
            core: ViewCore::new("MappedView", self.scheduler.clone()),
            source,
            cache: Mutex::new(cache),
            derived_from: Mutex::new(Vec::new()),
        });

        let upstream: Arc<dyn ChangeSource<S>> = inner.source.clone();
        let config = pipeline_config(self.buffer_time, false, self.scheduler.as_ref());
        let weak = Arc::downgrade(&inner);
        let subscription = Refresher::new(upstream, Vec::new(), config).subscribe(move |batch| {
            if let Some(inner) = weak.upgrade() {
                inner.on_batch(batch);
            }
        });
        inner.core.pipeline.replace(subscription);
        inner.rederive();
        Ok(MappedView { inner })
    }
}

impl<S, U, Src> MappedViewBuilder<S, U, Src>
where
    S: Element,
    U: Element + Disposable,
    Src: ChangeSource<S> + 'static,
{
    /// Disposes derived values when they are evicted and when the view is
    /// disposed.
    pub fn with_disposal(mut self) -> Self {
        self.disposal = Some(MappingCache::with_disposal);
        self
    }
}
