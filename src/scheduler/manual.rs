//! Manually advanced scheduler
//!
//! A virtual clock for deterministic tests and offline sampling. Time only
//! moves when [`ManualScheduler::advance`] or
//! [`ManualScheduler::advance_to`] is called; due tasks run in deadline
//! order (ties broken by scheduling order). Every schedule, cancel and fire
//! is recorded so tests can assert on the exact interaction.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::Duration;

use tracing::trace;

use super::{CancelToken, Scheduler, TimerTask};

/// One recorded interaction with a [`ManualScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerRecord {
    /// A task was scheduled.
    Scheduled {
        /// Token handed back to the caller
        token: CancelToken,
        /// Requested delay
        delay: Duration,
        /// Virtual time of the call
        at: Duration,
    },
    /// `cancel` was called.
    Cancelled {
        /// Token passed to `cancel`
        token: CancelToken,
        /// Whether the task was still pending
        was_pending: bool,
        /// Virtual time of the call
        at: Duration,
    },
    /// A task ran.
    Fired {
        /// Token of the task that ran
        token: CancelToken,
        /// Virtual time at which it ran
        at: Duration,
    },
}

#[derive(Default)]
struct Inner {
    now: Duration,
    next_id: u64,
    /// Pending tasks keyed by `(deadline, token)`.
    queue: BTreeMap<(Duration, CancelToken), TimerTask>,
    records: Vec<SchedulerRecord>,
}

impl Inner {
    fn deadline_of(&self, token: CancelToken) -> Option<Duration> {
        self.queue
            .keys()
            .find(|(_, t)| *t == token)
            .map(|(deadline, _)| *deadline)
    }

    /// Removes and returns the earliest task due at or before `limit`.
    fn pop_due(&mut self, limit: Duration) -> Option<(Duration, CancelToken, TimerTask)> {
        let key = *self.queue.keys().next()?;
        if key.0 > limit {
            return None;
        }
        let task = self.queue.remove(&key)?;
        Some((key.0, key.1, task))
    }
}

/// Scheduler driven by an explicit virtual clock.
#[derive(Default)]
pub struct ManualScheduler {
    inner: RefCell<Inner>,
}

impl ManualScheduler {
    /// Creates a scheduler at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by `by`, running every task that becomes due.
    ///
    /// Returns the number of tasks that ran. Tasks scheduled by a running
    /// task are eligible in the same call if their deadline falls inside
    /// the window.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.inner.borrow().now.saturating_add(by);
        self.advance_to(target)
    }

    /// Advances the clock to the absolute time `target`.
    ///
    /// Moving backwards is ignored; the clock never decreases.
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut ran = 0;
        loop {
            // The borrow must end before the task runs: tasks may schedule
            // or cancel on this same scheduler.
            let due = self.inner.borrow_mut().pop_due(target);
            let Some((deadline, token, task)) = due else {
                break;
            };
            {
                let mut inner = self.inner.borrow_mut();
                inner.now = inner.now.max(deadline);
                let at = inner.now;
                inner.records.push(SchedulerRecord::Fired { token, at });
            }
            trace!(%token, ?deadline, "manual timer fired");
            task();
            ran += 1;
        }

        let mut inner = self.inner.borrow_mut();
        inner.now = inner.now.max(target);
        ran
    }

    /// Runs tasks already due at the current time without moving the clock.
    pub fn run_due(&self) -> usize {
        let now = self.inner.borrow().now;
        self.advance_to(now)
    }

    /// Returns whether the task behind `token` is still waiting to run.
    #[must_use]
    pub fn is_pending(&self, token: CancelToken) -> bool {
        self.inner.borrow().deadline_of(token).is_some()
    }

    /// Returns the deadline of a pending task.
    #[must_use]
    pub fn deadline(&self, token: CancelToken) -> Option<Duration> {
        self.inner.borrow().deadline_of(token)
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Every recorded interaction, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<SchedulerRecord> {
        self.inner.borrow().records.clone()
    }

    /// Tokens passed to `cancel`, in call order.
    #[must_use]
    pub fn cancelled_tokens(&self) -> Vec<CancelToken> {
        self.inner
            .borrow()
            .records
            .iter()
            .filter_map(|r| match r {
                SchedulerRecord::Cancelled { token, .. } => Some(*token),
                _ => None,
            })
            .collect()
    }

    /// Number of tasks that have run.
    #[must_use]
    pub fn fired_count(&self) -> usize {
        self.inner
            .borrow()
            .records
            .iter()
            .filter(|r| matches!(r, SchedulerRecord::Fired { .. }))
            .count()
    }

    /// Returns whether the task behind `token` has run.
    #[must_use]
    pub fn has_fired(&self, token: CancelToken) -> bool {
        self.inner
            .borrow()
            .records
            .iter()
            .any(|r| matches!(r, SchedulerRecord::Fired { token: t, .. } if *t == token))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, delay: Duration, task: TimerTask) -> CancelToken {
        let mut inner = self.inner.borrow_mut();
        let token = CancelToken::from_raw(inner.next_id);
        inner.next_id += 1;
        let at = inner.now;
        inner.queue.insert((at.saturating_add(delay), token), task);
        inner
            .records
            .push(SchedulerRecord::Scheduled { token, delay, at });
        trace!(%token, ?delay, "manual timer scheduled");
        token
    }

    fn cancel(&self, token: CancelToken) -> bool {
        // Dropping the task must happen outside the borrow; its captures may
        // have destructors that reach back into this scheduler.
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let removed = inner
                .deadline_of(token)
                .and_then(|deadline| inner.queue.remove(&(deadline, token)));
            let at = inner.now;
            inner.records.push(SchedulerRecord::Cancelled {
                token,
                was_pending: removed.is_some(),
                at,
            });
            removed
        };
        let was_pending = removed.is_some();
        drop(removed);
        trace!(%token, was_pending, "manual timer cancelled");
        was_pending
    }

    fn now(&self) -> Duration {
        self.inner.borrow().now
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ManualScheduler")
            .field("now", &inner.now)
            .field("pending", &inner.queue.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_task_runs_at_deadline_not_before() {
        let scheduler = ManualScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        scheduler.schedule_once(ms(100), Box::new(move || h.set(h.get() + 1)));

        assert_eq!(scheduler.advance(ms(99)), 0);
        assert_eq!(hits.get(), 0);
        assert_eq!(scheduler.advance(ms(1)), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(scheduler.now(), ms(100));
    }

    #[test]
    fn test_tasks_run_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (delay, label) in [(30, "c"), (10, "a"), (20, "b")] {
            let o = Rc::clone(&order);
            scheduler.schedule_once(ms(delay), Box::new(move || o.borrow_mut().push(label)));
        }

        assert_eq!(scheduler.advance(ms(50)), 3);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_clock_reads_deadline_inside_task() {
        let scheduler = Rc::new(ManualScheduler::new());
        let seen = Rc::new(Cell::new(Duration::ZERO));
        let (s, out) = (Rc::clone(&scheduler), Rc::clone(&seen));
        scheduler.schedule_once(ms(40), Box::new(move || out.set(s.now())));

        scheduler.advance(ms(100));
        assert_eq!(seen.get(), ms(40));
        assert_eq!(scheduler.now(), ms(100));
    }

    #[test]
    fn test_cancel_prevents_fire() {
        let scheduler = ManualScheduler::new();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let token = scheduler.schedule_once(ms(10), Box::new(move || f.set(true)));

        assert!(scheduler.cancel(token));
        assert!(!scheduler.is_pending(token));
        scheduler.advance(ms(100));
        assert!(!fired.get());
        assert!(!scheduler.has_fired(token));
        assert_eq!(scheduler.cancelled_tokens(), vec![token]);
    }

    #[test]
    fn test_cancel_twice_reports_not_pending() {
        let scheduler = ManualScheduler::new();
        let token = scheduler.schedule_once(ms(10), Box::new(|| {}));
        assert!(scheduler.cancel(token));
        assert!(!scheduler.cancel(token));
        assert_eq!(scheduler.cancelled_tokens().len(), 2);
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let scheduler = ManualScheduler::new();
        let token = scheduler.schedule_once(ms(10), Box::new(|| {}));
        scheduler.advance(ms(10));
        assert!(!scheduler.cancel(token));
        assert_eq!(scheduler.fired_count(), 1);
    }

    #[test]
    fn test_task_may_schedule_within_window() {
        let scheduler = Rc::new(ManualScheduler::new());
        let hits = Rc::new(Cell::new(0));
        let (s, h) = (Rc::clone(&scheduler), Rc::clone(&hits));
        scheduler.schedule_once(
            ms(10),
            Box::new(move || {
                let h2 = Rc::clone(&h);
                s.schedule_once(ms(10), Box::new(move || h2.set(h2.get() + 1)));
            }),
        );

        assert_eq!(scheduler.advance(ms(25)), 2);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_zero_delay_waits_for_run_due() {
        let scheduler = ManualScheduler::new();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        scheduler.schedule_once(Duration::ZERO, Box::new(move || f.set(true)));
        assert!(!fired.get());
        assert_eq!(scheduler.run_due(), 1);
        assert!(fired.get());
    }

    #[test]
    fn test_advance_to_never_moves_backwards() {
        let scheduler = ManualScheduler::new();
        scheduler.advance(ms(50));
        scheduler.advance_to(ms(10));
        assert_eq!(scheduler.now(), ms(50));
    }

    #[test]
    fn test_records_capture_full_history() {
        let scheduler = ManualScheduler::new();
        let a = scheduler.schedule_once(ms(5), Box::new(|| {}));
        let b = scheduler.schedule_once(ms(50), Box::new(|| {}));
        scheduler.advance(ms(10));
        scheduler.cancel(b);

        assert_eq!(
            scheduler.records(),
            vec![
                SchedulerRecord::Scheduled { token: a, delay: ms(5), at: ms(0) },
                SchedulerRecord::Scheduled { token: b, delay: ms(50), at: ms(0) },
                SchedulerRecord::Fired { token: a, at: ms(5) },
                SchedulerRecord::Cancelled { token: b, was_pending: true, at: ms(10) },
            ]
        );
    }

    #[test]
    fn test_debug_output() {
        let scheduler = ManualScheduler::new();
        let debug = format!("{scheduler:?}");
        assert!(debug.contains("ManualScheduler"));
        assert!(debug.contains("pending: 0"));
    }
}
