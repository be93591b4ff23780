//! Tokio-backed scheduler
//!
//! Each timer is a `spawn_local` task racing a sleep against a child
//! [`CancellationToken`]. The deadline is fixed when the timer is scheduled,
//! not when the task is first polled. The scheduler must therefore be used from
//! inside a [`tokio::task::LocalSet`]; that keeps all sequencer mutations on
//! one thread, matching the single event loop the sequencer is written for.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{CancelToken, Scheduler, TimerTask};

/// Scheduler running timers on the current `LocalSet`.
///
/// Dropping the scheduler (or calling [`shutdown`](Self::shutdown)) cancels
/// every outstanding timer.
pub struct TokioScheduler {
    epoch: Instant,
    next_id: Cell<u64>,
    /// Pending timers by token id; entries are removed when they fire.
    timers: Rc<RefCell<HashMap<CancelToken, CancellationToken>>>,
    /// Parent of every per-timer token
    root: CancellationToken,
}

impl TokioScheduler {
    /// Creates a scheduler whose clock starts now.
    ///
    /// Uses tokio's clock, so paused-time tests control it with
    /// `tokio::time::advance`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            next_id: Cell::new(0),
            timers: Rc::new(RefCell::new(HashMap::new())),
            root: CancellationToken::new(),
        }
    }

    /// Number of timers that have neither fired nor been cancelled.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Cancels every outstanding timer.
    pub fn shutdown(&self) {
        self.root.cancel();
        self.timers.borrow_mut().clear();
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    /// # Panics
    ///
    /// Panics if called outside a `LocalSet` (a `spawn_local` requirement).
    fn schedule_once(&self, delay: Duration, task: TimerTask) -> CancelToken {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let token = CancelToken::from_raw(id);

        let cancel = self.root.child_token();
        self.timers.borrow_mut().insert(token, cancel.clone());
        let timers = Rc::clone(&self.timers);
        let deadline = Instant::now() + delay;

        tokio::task::spawn_local(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    trace!(%token, "timer task cancelled");
                }
                () = tokio::time::sleep_until(deadline) => {
                    timers.borrow_mut().remove(&token);
                    trace!(%token, "timer fired");
                    task();
                }
            }
        });

        debug!(%token, ?delay, "timer scheduled");
        token
    }

    fn cancel(&self, token: CancelToken) -> bool {
        let removed = self.timers.borrow_mut().remove(&token);
        removed.is_some_and(|cancel| {
            cancel.cancel();
            debug!(%token, "timer cancelled");
            true
        })
    }

    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("pending", &self.pending_count())
            .field("shut_down", &self.root.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        LocalSet::new()
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let fired = Rc::new(Cell::new(false));
                let f = Rc::clone(&fired);
                scheduler.schedule_once(Duration::from_secs(4), Box::new(move || f.set(true)));

                tokio::time::advance(Duration::from_millis(3999)).await;
                settle().await;
                assert!(!fired.get());
                assert_eq!(scheduler.pending_count(), 1);

                tokio::time::advance(Duration::from_millis(2)).await;
                settle().await;
                assert!(fired.get());
                assert_eq!(scheduler.pending_count(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        LocalSet::new()
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let fired = Rc::new(Cell::new(false));
                let f = Rc::clone(&fired);
                let token =
                    scheduler.schedule_once(Duration::from_secs(1), Box::new(move || f.set(true)));

                assert!(scheduler.cancel(token));
                assert!(!scheduler.cancel(token));

                tokio::time::advance(Duration::from_secs(2)).await;
                settle().await;
                assert!(!fired.get());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_all() {
        LocalSet::new()
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let hits = Rc::new(Cell::new(0));
                for delay in [10, 20, 30] {
                    let h = Rc::clone(&hits);
                    scheduler.schedule_once(
                        Duration::from_millis(delay),
                        Box::new(move || h.set(h.get() + 1)),
                    );
                }

                scheduler.shutdown();
                assert_eq!(scheduler.pending_count(), 0);

                tokio::time::advance(Duration::from_millis(100)).await;
                settle().await;
                assert_eq!(hits.get(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_now_follows_tokio_clock() {
        let scheduler = TokioScheduler::new();
        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(scheduler.now(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_outstanding_timers() {
        LocalSet::new()
            .run_until(async {
                let fired = Rc::new(Cell::new(false));
                {
                    let scheduler = TokioScheduler::new();
                    let f = Rc::clone(&fired);
                    scheduler.schedule_once(Duration::from_secs(1), Box::new(move || f.set(true)));
                }

                tokio::time::advance(Duration::from_secs(2)).await;
                settle().await;
                assert!(!fired.get());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_counts_from_schedule_call() {
        let local = LocalSet::new();
        let scheduler = TokioScheduler::new();
        let fired = Rc::new(Cell::new(false));
        {
            let _guard = local.enter();
            let f = Rc::clone(&fired);
            scheduler.schedule_once(Duration::from_secs(4), Box::new(move || f.set(true)));
        }

        // The task has not been polled yet while time moves on.
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(!fired.get());

        local
            .run_until(async {
                tokio::time::advance(Duration::from_millis(999)).await;
                settle().await;
                assert!(!fired.get());

                tokio::time::advance(Duration::from_millis(2)).await;
                settle().await;
                assert!(fired.get());
            })
            .await;
    }
}
