//! Simulated animation runtime
//!
//! Stands in for the motion library that would normally report when the
//! projectile lands and when the pendulum comes to rest. Both completions
//! are scheduled on the sequencer's own scheduler so a virtual clock drives
//! the whole sequence deterministically.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::scheduler::{CancelToken, Scheduler};
use crate::sequencer::SequencerHandle;

use super::timeline::Timelines;

/// Fires the fall and swing completions after their timeline durations.
///
/// The swing timer is armed only when the fall completion is accepted,
/// mirroring a pendulum that starts on impact.
pub struct SimulatedRuntime<S: Scheduler + Clone + 'static> {
    scheduler: S,
    tokens: Rc<RefCell<Vec<CancelToken>>>,
}

impl<S: Scheduler + Clone + 'static> SimulatedRuntime<S> {
    /// Launches the projectile timeline for the sequencer behind `handle`.
    #[must_use]
    pub fn start(scheduler: S, handle: SequencerHandle<S>, timelines: &Timelines) -> Self {
        let tokens = Rc::new(RefCell::new(Vec::new()));
        let swing = timelines.swing();

        let fall_task = {
            let scheduler = scheduler.clone();
            let tokens = Rc::clone(&tokens);
            move || {
                let Some(outcome) = handle.fall_complete() else {
                    return;
                };
                if outcome.is_ignored() {
                    return;
                }
                let token = scheduler.schedule_once(
                    swing,
                    Box::new(move || {
                        handle.swing_complete();
                    }),
                );
                debug!(%token, ?swing, "pendulum started");
                tokens.borrow_mut().push(token);
            }
        };

        let token = scheduler.schedule_once(timelines.fall(), Box::new(fall_task));
        debug!(%token, fall = ?timelines.fall(), "projectile launched");
        tokens.borrow_mut().push(token);

        Self { scheduler, tokens }
    }

    /// Tokens of every timer this runtime armed, in order.
    #[must_use]
    pub fn tokens(&self) -> Vec<CancelToken> {
        self.tokens.borrow().clone()
    }

    /// Cancels any completion that has not fired yet.
    ///
    /// Returns how many timers were still pending.
    pub fn stop(&self) -> usize {
        self.tokens
            .borrow_mut()
            .drain(..)
            .filter(|token| self.scheduler.cancel(*token))
            .count()
    }
}

impl<S: Scheduler + Clone + 'static> std::fmt::Debug for SimulatedRuntime<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedRuntime")
            .field("tokens", &self.tokens.borrow())
            .finish_non_exhaustive()
    }
}
