//! Debounced identity projection.

use super::{LiveView, Mirror, ViewCore};
use crate::scheduler::SharedScheduler;
use crate::source::{ChangeSource, MutableSource};
use liveseq_core::{Element, Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// A copy of a source that only catches up once the source has been quiet
/// for the buffer time.
pub struct ThrottledView<T, S> {
    inner: Arc<Mirror<T, S>>,
    buffer_time: Mutex<Duration>,
}

impl<T, S> ThrottledView<T, S>
where
    T: Element,
    S: ChangeSource<T> + 'static,
{
    pub fn builder() -> ThrottledViewBuilder<T, S> {
        ThrottledViewBuilder::default()
    }

    pub fn source(&self) -> &Arc<S> {
        &self.inner.source
    }

    pub fn buffer_time(&self) -> Duration {
        *self.buffer_time.lock()
    }

    /// Replaces the debounce window, restarting the pipeline.
    pub fn set_buffer_time(&self, buffer_time: Duration) -> Result<()> {
        self.inner.core.ensure_live()?;
        *self.buffer_time.lock() = buffer_time;
        tracing::debug!(view = "ThrottledView", ?buffer_time, "reconfigured");
        Mirror::attach(&self.inner, &self.inner.refresher(buffer_time, true));
        Ok(())
    }
}

impl<T, S> ThrottledView<T, S>
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

impl<T, S> LiveView<T> for ThrottledView<T, S>
where
    T: Element,
    S: ChangeSource<T> + 'static,
{
    fn core(&self) -> &ViewCore<T> {
        &self.inner.core
    }
}

/// Builder for [`ThrottledView`].
pub struct ThrottledViewBuilder<T, S> {
    source: Option<Arc<S>>,
    buffer_time: Duration,
    scheduler: Option<SharedScheduler>,
    _element: std::marker::PhantomData<fn() -> T>,
}

impl<T, S> Default for ThrottledViewBuilder<T, S> {
    fn default() -> Self {
        Self {
            source: None,
            buffer_time: Duration::ZERO,
            scheduler: None,
            _element: std::marker::PhantomData,
        }
    }
}

impl<T, S> ThrottledViewBuilder<T, S>
where
    T: Element,
    S: ChangeSource<T> + 'static,
{
    pub fn source(mut self, source: Arc<S>) -> Self {
        self.source = Some(source);
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

    pub fn build(self) -> Result<ThrottledView<T, S>> {
        let source = self.source.ok_or(Error::missing_argument("source"))?;
        let inner = Mirror::new("ThrottledView", source, self.scheduler);
        Mirror::attach(&inner, &inner.refresher(self.buffer_time, false));
        inner.resync();
        Ok(ThrottledView {
            inner,
            buffer_time: Mutex::new(self.buffer_time),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Subscription;
    use crate::scheduler::VirtualScheduler;
    use crate::source::ObservableList;
    use liveseq_core::ChangeEvent;

    fn throttled(
        list: &Arc<ObservableList<i32>>,
        scheduler: &Arc<VirtualScheduler>,
    ) -> ThrottledView<i32, ObservableList<i32>> {
        ThrottledView::builder()
            .source(list.clone())
            .buffer_time(Duration::from_millis(10))
            .scheduler(scheduler.clone())
            .build()
            .unwrap()
    }

    fn record(view: &ThrottledView<i32, ObservableList<i32>>) -> (Arc<Mutex<Vec<ChangeEvent<i32>>>>, Subscription) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        let sub = view.subscribe_collection(move |e| l.lock().push(e.clone())).unwrap();
        (log, sub)
    }

    #[test]
    fn test_burst_publishes_one_reset() {
        let list = Arc::new(ObservableList::<i32>::new());
        let scheduler = VirtualScheduler::shared();
        let view = throttled(&list, &scheduler);
        let (log, _sub) = record(&view);

        view.push(1).unwrap();
        view.push(2).unwrap();
        view.push(3).unwrap();
        assert!(view.is_empty().unwrap());

        scheduler.advance_by(Duration::from_millis(10));
        assert_eq!(view.current().unwrap(), vec![1, 2, 3]);
        assert_eq!(*log.lock(), vec![ChangeEvent::Reset]);
    }

    #[test]
    fn test_single_edit_keeps_its_event() {
        let list = Arc::new(ObservableList::from_vec(vec![1, 2]));
        let scheduler = VirtualScheduler::shared();
        let view = throttled(&list, &scheduler);
        let (log, _sub) = record(&view);

        view.set(0, 5).unwrap();
        scheduler.advance_by(Duration::from_millis(15));

        assert_eq!(*log.lock(), vec![ChangeEvent::replace(5, 1, 0)]);
    }

    #[test]
    fn test_set_buffer_time_resyncs() {
        let list = Arc::new(ObservableList::<i32>::new());
        let scheduler = VirtualScheduler::shared();
        let view = throttled(&list, &scheduler);

        list.push(1);
        view.set_buffer_time(Duration::ZERO).unwrap();
        assert_eq!(view.current().unwrap(), vec![1]);

        list.push(2);
        assert_eq!(view.current().unwrap(), vec![1, 2]);
        assert_eq!(view.buffer_time(), Duration::ZERO);
    }
}
