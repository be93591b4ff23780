//! One-shot timer scheduling
//!
//! The sequencer never owns a clock. It asks a [`Scheduler`] to run a task
//! once after a delay and keeps the returned [`CancelToken`] so the task can
//! be revoked on teardown.
//!
//! # Architecture
//!
//! - [`Scheduler`]: `schedule_once` / `cancel` / `now` seam
//! - [`ManualScheduler`]: virtual clock advanced explicitly, records every call
//! - [`TokioScheduler`]: `spawn_local` timers on a `LocalSet`
//!
//! Everything here is single-threaded: tasks are `!Send` closures and run on
//! the thread that drives the scheduler.

pub mod manual;
pub mod tokio_timer;

use std::rc::Rc;
use std::time::Duration;

pub use manual::{ManualScheduler, SchedulerRecord};
pub use tokio_timer::TokioScheduler;

/// A deferred unit of work run at most once by a scheduler.
pub type TimerTask = Box<dyn FnOnce()>;

/// Opaque handle for a scheduled task.
///
/// Tokens are unique per scheduler instance and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CancelToken(u64);

impl CancelToken {
    /// Wraps a raw token id.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw token id.
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Clock and one-shot timer facility.
///
/// Implementations must never run a task synchronously from inside
/// [`schedule_once`](Self::schedule_once); callers may hold borrows of their
/// own state while scheduling.
pub trait Scheduler {
    /// Schedules `task` to run once after `delay`.
    fn schedule_once(&self, delay: Duration, task: TimerTask) -> CancelToken;

    /// Cancels a scheduled task.
    ///
    /// Returns `true` if the task was still pending. Cancelling a fired or
    /// already-cancelled token is a no-op that returns `false`.
    fn cancel(&self, token: CancelToken) -> bool;

    /// Time elapsed on this scheduler's clock since it was created.
    fn now(&self) -> Duration;
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn schedule_once(&self, delay: Duration, task: TimerTask) -> CancelToken {
        (**self).schedule_once(delay, task)
    }

    fn cancel(&self, token: CancelToken) -> bool {
        (**self).cancel(token)
    }

    fn now(&self) -> Duration {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_token_display() {
        assert_eq!(CancelToken::from_raw(7).to_string(), "timer#7");
        assert_eq!(CancelToken::from_raw(7).to_raw(), 7);
    }

    #[test]
    fn test_rc_forwards_to_inner() {
        let scheduler = Rc::new(ManualScheduler::new());
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);

        let token = Scheduler::schedule_once(
            &Rc::clone(&scheduler),
            Duration::from_millis(10),
            Box::new(move || flag.set(true)),
        );
        assert!(scheduler.is_pending(token));

        scheduler.advance(Duration::from_millis(10));
        assert!(fired.get());
        assert_eq!(Scheduler::now(&scheduler), Duration::from_millis(10));
    }
}
