// Scheduler - Periodic tick sources for the sequencer
//
// `ThreadScheduler` runs the callback on a dedicated thread against
// absolute deadlines so rounding errors never accumulate.
// `ManualScheduler` runs callbacks only when a test advances virtual time.
//
// Cancellation is synchronous: once `cancel()` returns the callback is not
// running and will never run again. The one exception is a callback that
// cancels its own handle; it finishes its current invocation.

use crate::error::{EngineError, EngineResult};
use crate::sequencer::clock::{Clock, ManualClock};
use log::{debug, trace};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Callback invoked once per period
pub type TickCallback = Box<dyn FnMut() + Send + 'static>;

/// Source of periodic callbacks
pub trait Scheduler: Send + Sync {
    /// Run `callback` every `interval`, first one interval from now
    fn schedule_repeating(
        &self,
        interval: Duration,
        callback: TickCallback,
    ) -> EngineResult<Box<dyn ScheduleHandle>>;
}

/// Handle to a running schedule; dropping it cancels
pub trait ScheduleHandle: Send {
    fn cancel(&mut self);
}

/// Real-time scheduler backed by one thread per schedule
#[derive(Debug, Default, Clone)]
pub struct ThreadScheduler;

impl ThreadScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule_repeating(
        &self,
        interval: Duration,
        mut callback: TickCallback,
    ) -> EngineResult<Box<dyn ScheduleHandle>> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled_clone = Arc::clone(&cancelled);

        let handle = thread::Builder::new()
            .name("padgroove-tick".into())
            .spawn(move || {
                debug!("Tick thread started ({:?} interval)", interval);
                let mut deadline = Instant::now() + interval;

                while !cancelled_clone.load(Ordering::Acquire) {
                    let now = Instant::now();
                    if now < deadline {
                        // Woken early by cancel() via unpark
                        thread::park_timeout(deadline - now);
                        continue;
                    }

                    callback();
                    deadline += interval;

                    // Fell more than a period behind (suspended process, debugger):
                    // skip the missed ticks instead of bursting through them
                    let now = Instant::now();
                    if now > deadline + interval {
                        trace!("Tick thread late by {:?}, resyncing", now - deadline);
                        deadline = now + interval;
                    }
                }

                debug!("Tick thread finished");
            })
            .map_err(|e| EngineError::Scheduler(format!("failed to spawn tick thread: {}", e)))?;

        Ok(Box::new(ThreadHandle {
            cancelled,
            thread: Some(handle),
        }))
    }
}

struct ThreadHandle {
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ScheduleHandle for ThreadHandle {
    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);

        if let Some(handle) = self.thread.take() {
            handle.thread().unpark();
            // A tick cancelling its own schedule cannot join itself
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for ThreadHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct ManualTask {
    id: u64,
    interval: Duration,
    next_due: Duration,
    callback: Arc<Mutex<TickCallback>>,
    cancelled: Arc<AtomicBool>,
}

/// Virtual-time scheduler for deterministic tests
///
/// Callbacks run on the thread calling [`ManualScheduler::advance`], in due
/// order, with the shared [`ManualClock`] set to each callback's due time.
#[derive(Clone)]
pub struct ManualScheduler {
    clock: ManualClock,
    tasks: Arc<Mutex<Vec<ManualTask>>>,
    next_id: Arc<AtomicU64>,
}

impl ManualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            tasks: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Number of live schedules
    pub fn active_schedules(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Interval of the most recently created live schedule
    pub fn current_interval(&self) -> Option<Duration> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .map(|t| t.interval)
    }

    /// Advance virtual time by `by`, firing every callback that falls due
    /// Returns the number of callbacks run
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.now() + by;
        let mut fired = 0;

        loop {
            let due = {
                let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
                tasks.retain(|t| !t.cancelled.load(Ordering::Acquire));
                tasks
                    .iter_mut()
                    .filter(|t| t.next_due <= target)
                    .min_by_key(|t| (t.next_due, t.id))
                    .map(|t| {
                        let due_at = t.next_due;
                        t.next_due += t.interval;
                        (due_at, Arc::clone(&t.callback), Arc::clone(&t.cancelled))
                    })
            };

            let Some((due_at, callback, cancelled)) = due else {
                break;
            };
            if cancelled.load(Ordering::Acquire) {
                continue;
            }

            self.clock.set(due_at);
            {
                let mut callback = callback.lock().unwrap_or_else(PoisonError::into_inner);
                (*callback)();
            }
            fired += 1;
        }

        self.clock.set(target);
        fired
    }

    /// Advance by `ticks` whole periods of the current schedule
    pub fn advance_ticks(&self, ticks: u32) -> usize {
        match self.current_interval() {
            Some(interval) => self.advance(interval * ticks),
            None => 0,
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(
        &self,
        interval: Duration,
        callback: TickCallback,
    ) -> EngineResult<Box<dyn ScheduleHandle>> {
        if interval.is_zero() {
            return Err(EngineError::Scheduler("interval must be non-zero".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancelled = Arc::new(AtomicBool::new(false));
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ManualTask {
                id,
                interval,
                next_due: self.clock.now() + interval,
                callback: Arc::new(Mutex::new(callback)),
                cancelled: Arc::clone(&cancelled),
            });

        Ok(Box::new(ManualHandle {
            id,
            cancelled,
            tasks: Arc::clone(&self.tasks),
        }))
    }
}

struct ManualHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
    tasks: Arc<Mutex<Vec<ManualTask>>>,
}

impl ScheduleHandle for ManualHandle {
    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|t| t.id != self.id);
    }
}

impl Drop for ManualHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
