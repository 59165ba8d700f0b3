//! Identity projection over a swappable source.

use super::{pipeline_config, LiveView, ViewCore};
use crate::observer::Subscription;
use crate::refresher::Refresher;
use crate::scheduler::SharedScheduler;
use crate::source::ChangeSource;
use liveseq_core::{Element, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct SerialInner<T> {
    core: ViewCore<T>,
    source: Mutex<Option<Arc<dyn ChangeSource<T>>>>,
}

/// Mirrors whichever source is currently plugged in.
///
/// Swapping the source publishes the diff between the old and the new
/// contents; removing it empties the view.
pub struct SerialView<T> {
    inner: Arc<SerialInner<T>>,
}

impl<T: Element> SerialView<T> {
    /// Creates a view with no source.
    pub fn new(scheduler: Option<SharedScheduler>) -> Self {
        Self {
            inner: Arc::new(SerialInner {
                core: ViewCore::new("SerialView", scheduler),
                source: Mutex::new(None),
            }),
        }
    }

    /// Returns the current source.
    pub fn source(&self) -> Option<Arc<dyn ChangeSource<T>>> {
        self.inner.source.lock().clone()
    }

    /// Replaces the source. `None` detaches and empties the view.
    pub fn set_source(&self, source: Option<Arc<dyn ChangeSource<T>>>) -> Result<()> {
        let core = &self.inner.core;
        core.ensure_live()?;
        *self.inner.source.lock() = source.clone();

        match source {
            Some(source) => {
                let config = pipeline_config(Duration::ZERO, true, None);
                let weak = Arc::downgrade(&self.inner);
                let subscription = Refresher::new(source.clone(), Vec::new(), config).subscribe(move |batch| {
                    if let Some(inner) = weak.upgrade() {
                        inner.core.mirror(&*source, batch);
                    }
                });
                core.pipeline.replace(subscription);
            }
            None => {
                core.pipeline.replace(Subscription::empty());
                core.tracker.reset(Vec::new(), &core.notifier)?;
            }
        }
        tracing::debug!(view = "SerialView", attached = self.inner.source.lock().is_some(), "source replaced");
        Ok(())
    }
}

impl<T: Element> LiveView<T> for SerialView<T> {
    fn core(&self) -> &ViewCore<T> {
        &self.inner.core
    }

    fn dispose(&self) {
        if self.inner.core.dispose() {
            self.inner.source.lock().take();
        }
    }
}
