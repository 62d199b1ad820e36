//! Background loop that calls a step function at a fixed rate.
use crate::{LifeError, Result};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Shortest pause between two steps, even when a step overran the interval.
pub const FLOOR_SLEEP: Duration = Duration::from_millis(1);

/// Lifecycle of a [`Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// No loop is active.
    Idle,
    /// The loop is calling the step function.
    Running,
    /// A stop was requested and the loop has not yet exited.
    Stopping,
}

struct Shared {
    state: Mutex<SchedulerState>,
    wakeup: Condvar,
    interval_nanos: AtomicU64,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_nanos.load(Ordering::Relaxed))
    }

    fn set_interval(&self, interval: Duration) {
        let nanos = u64::try_from(interval.as_nanos()).unwrap_or(u64::MAX);
        self.interval_nanos.store(nanos, Ordering::Relaxed);
        tracing::debug!(?interval, "scheduler interval set");
    }

    fn request_stop(&self) {
        let mut state = self.state();
        if *state == SchedulerState::Running {
            *state = SchedulerState::Stopping;
        }
        self.wakeup.notify_all();
    }

    /// Sleeps for `duration` unless a stop is requested first.
    ///
    /// Returns `true` if the loop should exit.
    fn wait_for_stop(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut state = self.state();
        loop {
            if *state != SchedulerState::Running {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            state = self
                .wakeup
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// Marks the scheduler idle when the loop exits, including by a panicking step.
struct IdleOnExit(Arc<Shared>);

impl Drop for IdleOnExit {
    fn drop(&mut self) {
        *self.0.state() = SchedulerState::Idle;
        self.0.wakeup.notify_all();
    }
}

/// Cheap cloneable access to a [`Scheduler`] that never waits for its loop.
///
/// Unlike [`Scheduler::stop`], [`SchedulerHandle::request_stop`] returns at
/// once, so it is safe to call from code the loop itself may be waiting on.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        *self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Same as [`Scheduler::set_interval`].
    pub fn set_interval(&self, interval: Duration) {
        self.shared.set_interval(interval);
    }

    /// Asks the loop to exit before its next step, without waiting for it.
    pub fn request_stop(&self) {
        self.shared.request_stop();
    }
}

/// Runs a step function on a dedicated thread at a target interval.
///
/// Each iteration times the step and then sleeps for the rest of the interval,
/// but never less than [`FLOOR_SLEEP`]. Steps that take longer than the
/// interval slow the cadence down; missed ticks are not made up for.
///
/// Stopping is cooperative: the loop checks for a stop request between steps,
/// and a step in progress always runs to completion. The step function has no
/// way to report errors, so it must handle its own failures.
pub struct Scheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState::Idle),
                wakeup: Condvar::new(),
                interval_nanos: AtomicU64::new(0),
            }),
            worker: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: self.shared.clone(),
        }
    }

    /// Current target interval between the starts of two steps.
    pub fn interval(&self) -> Duration {
        self.shared.interval()
    }

    /// Starts calling `step` every `interval` on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`LifeError::SchedulerBusy`] if the loop is already running.
    pub fn start(
        &mut self,
        mut step: impl FnMut() + Send + 'static,
        interval: Duration,
    ) -> Result<()> {
        if self.is_running() {
            return Err(LifeError::SchedulerBusy);
        }
        // a previous loop may still be exiting
        self.join_worker();
        *self.shared.state() = SchedulerState::Running;
        self.set_interval(interval);

        let shared = self.shared.clone();
        self.worker = Some(thread::spawn(move || {
            let _idle = IdleOnExit(shared.clone());
            let mut ticks = 0u64;
            loop {
                if *shared.state() != SchedulerState::Running {
                    break;
                }
                let start = Instant::now();
                step();
                ticks += 1;
                let elapsed = start.elapsed();
                tracing::trace!(tick = ticks, ?elapsed, "scheduled step done");

                let wait = shared.interval().saturating_sub(elapsed).max(FLOOR_SLEEP);
                if shared.wait_for_stop(wait) {
                    break;
                }
            }
            tracing::debug!(ticks, "scheduler loop exited");
        }));
        tracing::debug!(?interval, "scheduler started");
        Ok(())
    }

    /// Changes the interval; the loop picks it up when it computes its next sleep.
    pub fn set_interval(&self, interval: Duration) {
        self.shared.set_interval(interval);
    }

    /// Requests the loop to stop and waits until it has exited, so no step
    /// starts after this returns. A step that is already running finishes first.
    ///
    /// When called from inside the step function the request is made but the
    /// loop is not waited for.
    pub fn stop(&mut self) {
        self.shared.request_stop();
        let on_worker = self
            .worker
            .as_ref()
            .is_some_and(|worker| worker.thread().id() == thread::current().id());
        if !on_worker {
            self.join_worker();
        }
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("scheduled step panicked, the loop was aborted");
            }
            tracing::debug!("scheduler stopped");
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
