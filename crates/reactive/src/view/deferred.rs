//! Identity projection whose refreshes can be held back.

use super::{LiveView, Mirror, ViewCore};
use crate::refresher::{DeferScope, Refresher};
use crate::scheduler::SharedScheduler;
use crate::source::{ChangeSource, MutableSource};
use liveseq_core::{Element, Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// A copy of a source that can be told to stop catching up for a while.
///
/// While any scope returned by [`defer_refresh`](Self::defer_refresh) is
/// alive, source edits are collected; dropping the outermost scope applies
/// them as one refresh.
pub struct DeferredView<T, S> {
    inner: Arc<Mirror<T, S>>,
    refresher: Refresher<T>,
}

impl<T, S> DeferredView<T, S>
where
    T: Element,
    S: ChangeSource<T> + 'static,
{
    pub fn builder() -> DeferredViewBuilder<T, S> {
        DeferredViewBuilder::default()
    }

    pub fn source(&self) -> &Arc<S> {
        &self.inner.source
    }

    /// Holds refreshes back until the returned scope is dropped. Scopes
    /// nest. A disposed view hands out an inert scope.
    pub fn defer_refresh(&self) -> DeferScope {
        if self.inner.core.is_disposed() {
            return DeferScope::empty();
        }
        self.refresher.defer()
    }
}

impl<T, S> DeferredView<T, S>
where
    T: Element,
    S: MutableSource<T> + 'static,
{
    pub fn push(&self, item: T) -> Result<()> {
        self.inner.push(item)
    }

    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        self.inner.insert(index, item)
    }

    pub fn remove(&self, item: &T) -> Result<bool> {
        self.inner.remove(item)
    }

    pub fn remove_at(&self, index: usize) -> Result<T> {
        self.inner.remove_at(index)
    }

    pub fn set(&self, index: usize, item: T) -> Result<T> {
        self.inner.set(index, item)
    }
}

impl<T, S> LiveView<T> for DeferredView<T, S>
where
    T: Element,
    S: ChangeSource<T> + 'static,
{
    fn core(&self) -> &ViewCore<T> {
        &self.inner.core
    }
}

/// Builder for [`DeferredView`].
pub struct DeferredViewBuilder<T, S> {
    source: Option<Arc<S>>,
    buffer_time: Duration,
    scheduler: Option<SharedScheduler>,
    _element: std::marker::PhantomData<fn() -> T>,
}

impl<T, S> Default for DeferredViewBuilder<T, S> {
    fn default() -> Self {
        Self {
            source: None,
            buffer_time: Duration::ZERO,
            scheduler: None,
            _element: std::marker::PhantomData,
        }
    }
}

impl<T, S> DeferredViewBuilder<T, S>
where
    T: Element,
    S: ChangeSource<T> + 'static,
{
    pub fn source(mut self, source: Arc<S>) -> Self {
        self.source = Some(source);
        self
    }

    /// Also debounces edits made outside a deferral scope.
    pub fn buffer_time(mut self, buffer_time: Duration) -> Self {
        self.buffer_time = buffer_time;
        self
    }

    pub fn scheduler(mut self, scheduler: SharedScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> Result<DeferredView<T, S>> {
        let source = self.source.ok_or(Error::missing_argument("source"))?;
        let inner = Mirror::new("DeferredView", source, self.scheduler);
        let refresher = inner.refresher(self.buffer_time, false);
        Mirror::attach(&inner, &refresher);
        inner.resync();
        Ok(DeferredView { inner, refresher })
    }
}
