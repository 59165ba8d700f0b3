//! Change-buffering pipelines.
//!
//! A [`Refresher`] sits between a change source (plus any number of
//! [`Trigger`]s) and a view. It turns raw events into batches:
//!
//! - with a zero buffer time every raw event is forwarded as a singleton
//!   batch and every trigger as `[Reset]`;
//! - with a positive buffer time events are collected in a trailing-edge
//!   debounce window timed on the configured scheduler, and the flush emits
//!   the collected batch, or `[Reset]` if a trigger fired in the window.
//!
//! The upstream subscription is shared by all downstream observers. It is
//! made when the first observer subscribes and dropped with the last one.
//!
//! While a [`DeferScope`] is alive, batches are held back and released as
//! one batch when the outermost scope drops.

use crate::observer::{Callback, Observers, Subscription};
use crate::scheduler::{ImmediateScheduler, SharedScheduler};
use crate::source::ChangeSource;
use crate::trigger::Trigger;
use liveseq_core::{Batch, BatchExt, ChangeEvent, Element};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Pipeline configuration.
#[derive(Clone, Default)]
pub struct RefresherConfig {
    buffer_time: Duration,
    signal_initial: bool,
    scheduler: Option<SharedScheduler>,
}

impl RefresherConfig {
    /// Zero buffer time, no initial signal, inline delivery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the debounce window.
    pub fn with_buffer_time(mut self, buffer_time: Duration) -> Self {
        self.buffer_time = buffer_time;
        self
    }

    /// Emits `[Reset]` to every new observer on subscription.
    pub fn with_signal_initial(mut self, signal_initial: bool) -> Self {
        self.signal_initial = signal_initial;
        self
    }

    /// Times debounce windows on `scheduler`.
    pub fn with_scheduler(mut self, scheduler: SharedScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    #[inline]
    pub fn buffer_time(&self) -> Duration {
        self.buffer_time
    }

    #[inline]
    pub fn signal_initial(&self) -> bool {
        self.signal_initial
    }

    #[inline]
    pub fn scheduler(&self) -> Option<&SharedScheduler> {
        self.scheduler.as_ref()
    }
}

impl std::fmt::Debug for RefresherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefresherConfig")
            .field("buffer_time", &self.buffer_time)
            .field("signal_initial", &self.signal_initial)
            .field("scheduler", &self.scheduler.is_some())
            .finish()
    }
}

struct PipelineState<T> {
    upstream: Option<Subscription>,
    /// Events collected in the open debounce window
    pending: Batch<T>,
    /// A trigger fired in the open window
    triggered: bool,
    /// Scheduler time at which the open window closes
    deadline: Option<Duration>,
    /// A window timer is outstanding
    armed: bool,
    /// Bumped on disconnect; timers from an older epoch are ignored
    epoch: u64,
    defer_depth: usize,
    held: Batch<T>,
    held_reset: bool,
}

struct Pipeline<T> {
    source: Arc<dyn ChangeSource<T>>,
    triggers: Vec<Trigger>,
    buffer_time: Duration,
    timer: Option<SharedScheduler>,
    downstream: Observers<Batch<T>>,
    state: Mutex<PipelineState<T>>,
}

/// A change-buffering pipeline over one source and a set of triggers.
///
/// Clones share the same pipeline.
pub struct Refresher<T> {
    pipeline: Arc<Pipeline<T>>,
    signal_initial: bool,
}

impl<T> Clone for Refresher<T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            signal_initial: self.signal_initial,
        }
    }
}

impl<T: Element> Refresher<T> {
    /// Creates a pipeline. Nothing is subscribed upstream until the first
    /// downstream observer arrives.
    pub fn new(source: Arc<dyn ChangeSource<T>>, triggers: Vec<Trigger>, config: RefresherConfig) -> Self {
        let timer = if config.buffer_time.is_zero() {
            None
        } else {
            Some(config.scheduler.clone().unwrap_or_else(ImmediateScheduler::shared))
        };
        Self {
            pipeline: Arc::new(Pipeline {
                source,
                triggers,
                buffer_time: config.buffer_time,
                timer,
                downstream: Observers::new(),
                state: Mutex::new(PipelineState {
                    upstream: None,
                    pending: Vec::new(),
                    triggered: false,
                    deadline: None,
                    armed: false,
                    epoch: 0,
                    defer_depth: 0,
                    held: Vec::new(),
                    held_reset: false,
                }),
            }),
            signal_initial: config.signal_initial,
        }
    }

    /// Registers a downstream observer. The returned subscription keeps the
    /// pipeline alive.
    ///
    /// With `signal_initial`, the observer receives `[Reset]` before this
    /// returns, after it is registered and the pipeline is connected.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Batch<T>) + Send + Sync + 'static,
    {
        let observer: Callback<Batch<T>> = Arc::new(observer);
        let registration = self.pipeline.downstream.subscribe_shared(Arc::clone(&observer));
        Pipeline::connect(&self.pipeline);
        if self.signal_initial {
            observer(&vec![ChangeEvent::Reset]);
        }

        let pipeline = Arc::clone(&self.pipeline);
        Subscription::new(move || {
            drop(registration);
            pipeline.disconnect_if_idle();
        })
    }

    /// Holds batches back until the returned scope (and every enclosing
    /// one) is dropped.
    pub fn defer(&self) -> DeferScope {
        self.pipeline.state.lock().defer_depth += 1;
        let pipeline = Arc::downgrade(&self.pipeline);
        DeferScope {
            release: Some(Box::new(move || {
                if let Some(pipeline) = pipeline.upgrade() {
                    pipeline.release_deferred();
                }
            })),
        }
    }

    /// Returns true while an upstream subscription is live.
    pub fn is_connected(&self) -> bool {
        self.pipeline.state.lock().upstream.is_some()
    }

    /// Returns the number of events waiting in the open debounce window.
    pub fn pending(&self) -> usize {
        self.pipeline.state.lock().pending.len()
    }
}

impl<T: Element> Pipeline<T> {
    fn connect(this: &Arc<Self>) {
        if this.state.lock().upstream.is_some() {
            return;
        }

        let mut subscriptions = Vec::with_capacity(this.triggers.len() + 1);
        let weak = Arc::downgrade(this);
        subscriptions.push(this.source.subscribe(Arc::new(move |event: &ChangeEvent<T>| {
            if let Some(pipeline) = weak.upgrade() {
                pipeline.on_event(event.clone());
            }
        })));
        for trigger in &this.triggers {
            let weak = Arc::downgrade(this);
            subscriptions.push(trigger.subscribe(move || {
                if let Some(pipeline) = weak.upgrade() {
                    pipeline.on_trigger();
                }
            }));
        }

        let mut state = this.state.lock();
        if state.upstream.is_none() {
            tracing::debug!(triggers = this.triggers.len(), buffer_time = ?this.buffer_time, "pipeline connected");
            state.upstream = Some(Subscription::all(subscriptions));
        }
    }

    fn disconnect_if_idle(&self) {
        if !self.downstream.is_empty() {
            return;
        }
        let upstream = {
            let mut state = self.state.lock();
            state.pending.clear();
            state.triggered = false;
            state.deadline = None;
            state.armed = false;
            state.epoch += 1;
            state.upstream.take()
        };
        if upstream.is_some() {
            tracing::debug!("pipeline disconnected");
        }
        drop(upstream);
    }

    fn on_event(self: &Arc<Self>, event: ChangeEvent<T>) {
        tracing::trace!(kind = ?event.kind(), "pipeline received event");
        let Some(timer) = &self.timer else {
            self.emit(vec![event]);
            return;
        };
        let arm = {
            let mut state = self.state.lock();
            state.pending.push(event);
            self.extend_window(&mut state, timer)
        };
        if let Some(epoch) = arm {
            self.arm(timer, self.buffer_time, epoch);
        }
    }

    fn on_trigger(self: &Arc<Self>) {
        let Some(timer) = &self.timer else {
            self.emit(vec![ChangeEvent::Reset]);
            return;
        };
        let arm = {
            let mut state = self.state.lock();
            state.triggered = true;
            self.extend_window(&mut state, timer)
        };
        if let Some(epoch) = arm {
            self.arm(timer, self.buffer_time, epoch);
        }
    }

    /// Pushes the window's deadline out. Returns the epoch to arm a timer
    /// for when none is outstanding.
    fn extend_window(&self, state: &mut PipelineState<T>, timer: &SharedScheduler) -> Option<u64> {
        state.deadline = Some(timer.now() + self.buffer_time);
        if state.armed {
            return None;
        }
        state.armed = true;
        Some(state.epoch)
    }

    fn arm(self: &Arc<Self>, timer: &SharedScheduler, delay: Duration, epoch: u64) {
        let weak: Weak<Self> = Arc::downgrade(self);
        timer.schedule_after(
            delay,
            Box::new(move || {
                if let Some(pipeline) = weak.upgrade() {
                    pipeline.on_timer(epoch);
                }
            }),
        );
    }

    /// Flushes the window if its deadline has passed, otherwise re-arms for
    /// the remaining time.
    fn on_timer(self: &Arc<Self>, epoch: u64) {
        let Some(timer) = &self.timer else {
            return;
        };
        let batch = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            let now = timer.now();
            let remaining = state.deadline.filter(|deadline| *deadline > now).map(|deadline| deadline - now);
            if let Some(remaining) = remaining {
                drop(state);
                self.arm(timer, remaining, epoch);
                return;
            }
            state.armed = false;
            state.deadline = None;
            let pending = std::mem::take(&mut state.pending);
            if std::mem::take(&mut state.triggered) {
                vec![ChangeEvent::Reset]
            } else {
                pending
            }
        };
        if batch.is_empty() {
            return;
        }
        tracing::debug!(events = batch.len(), reset = batch.has_reset(), "pipeline flushed");
        self.emit(batch);
    }

    fn emit(&self, batch: Batch<T>) {
        {
            let mut state = self.state.lock();
            if state.defer_depth > 0 {
                if batch.has_reset() {
                    state.held_reset = true;
                    state.held.clear();
                } else if !state.held_reset {
                    state.held.extend(batch);
                }
                return;
            }
        }
        self.downstream.notify(&batch);
    }

    fn release_deferred(&self) {
        let batch = {
            let mut state = self.state.lock();
            state.defer_depth = state.defer_depth.saturating_sub(1);
            if state.defer_depth > 0 {
                return;
            }
            let held = std::mem::take(&mut state.held);
            if std::mem::take(&mut state.held_reset) {
                vec![ChangeEvent::Reset]
            } else {
                held
            }
        };
        if batch.is_empty() {
            return;
        }
        tracing::debug!(events = batch.len(), "deferred batch released");
        self.downstream.notify(&batch);
    }
}

/// Guard returned by [`Refresher::defer`].
///
/// Scopes nest; the held batch is released when the outermost one drops.
#[must_use = "dropping a DeferScope releases it immediately"]
pub struct DeferScope {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl DeferScope {
    /// Creates a scope that holds nothing back.
    pub fn empty() -> Self {
        Self { release: None }
    }
}

impl Drop for DeferScope {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for DeferScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferScope")
            .field("active", &self.release.is_some())
            .finish()
    }
}
