//! Scheduler abstraction.
//!
//! A scheduler runs work "now" or "after a delay". The notifier uses it to
//! marshal collection notifications onto whatever context a consumer needs,
//! and the refresher uses it to time debounce windows.
//!
//! Two implementations ship with the crate:
//!
//! - [`ImmediateScheduler`]: runs work inline; delayed work runs on a
//!   short-lived timer thread.
//! - [`VirtualScheduler`]: queues all work against a manual clock that tests
//!   advance explicitly, making debounce behavior deterministic.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A unit of scheduled work.
pub type Task = Box<dyn FnOnce() + Send>;

/// Runs tasks now or after a delay.
pub trait Scheduler: Send + Sync {
    /// Time elapsed on this scheduler's clock.
    fn now(&self) -> Duration;

    /// Runs `task` as soon as the scheduler allows.
    fn schedule(&self, task: Task);

    /// Runs `task` once `delay` has elapsed on this scheduler's clock.
    fn schedule_after(&self, delay: Duration, task: Task);
}

/// Shared scheduler handle.
pub type SharedScheduler = Arc<dyn Scheduler>;

/// Runs tasks inline on the calling thread.
///
/// Delayed tasks with a non-zero delay are run on a detached timer thread.
#[derive(Debug)]
pub struct ImmediateScheduler {
    origin: Instant,
}

impl Default for ImmediateScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ImmediateScheduler {
    /// Creates a scheduler whose clock starts now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Creates a shared handle.
    pub fn shared() -> SharedScheduler {
        Arc::new(Self::new())
    }
}

impl Scheduler for ImmediateScheduler {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn schedule(&self, task: Task) {
        task();
    }

    fn schedule_after(&self, delay: Duration, task: Task) {
        if delay.is_zero() {
            task();
            return;
        }
        let spawned = std::thread::Builder::new()
            .name("liveseq-timer".into())
            .spawn(move || {
                std::thread::sleep(delay);
                task();
            });
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "failed to spawn timer thread; delayed task dropped");
        }
    }
}

struct VirtualState {
    now: Duration,
    seq: u64,
    queue: BTreeMap<(Duration, u64), Task>,
}

/// A scheduler driven by a manual clock.
///
/// Nothing runs until the clock is advanced. Tasks due at the same instant
/// run in scheduling order; tasks scheduled while advancing run in the same
/// advance if they fall due before its target.
pub struct VirtualScheduler {
    state: Mutex<VirtualState>,
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualScheduler {
    /// Creates a scheduler at time zero.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(VirtualState {
                now: Duration::ZERO,
                seq: 0,
                queue: BTreeMap::new(),
            }),
        }
    }

    /// Creates a shared handle.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advances the clock by `by`, running every task that falls due.
    /// Returns the number of tasks run.
    pub fn advance_by(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut ran = 0;
        loop {
            let task = {
                let mut state = self.state.lock();
                let due = match state.queue.first_key_value() {
                    Some((&(due, seq), _)) if due <= target => (due, seq),
                    _ => break,
                };
                state.now = due.0;
                state.queue.remove(&due)
            };
            if let Some(task) = task {
                task();
                ran += 1;
            }
        }
        self.state.lock().now = target;
        ran
    }

    /// Runs every task due at the current instant.
    pub fn run_pending(&self) -> usize {
        self.advance_by(Duration::ZERO)
    }

    /// Returns the number of queued tasks.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn enqueue(&self, delay: Duration, task: Task) {
        let mut state = self.state.lock();
        let due = state.now + delay;
        let seq = state.seq;
        state.seq += 1;
        state.queue.insert((due, seq), task);
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Duration {
        self.state.lock().now
    }

    fn schedule(&self, task: Task) {
        self.enqueue(Duration::ZERO, task);
    }

    fn schedule_after(&self, delay: Duration, task: Task) {
        self.enqueue(delay, task);
    }
}
