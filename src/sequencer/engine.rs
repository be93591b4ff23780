//! Timer-driven sequencer
//!
//! [`AnimationSequencer`] wraps [`SequencerState`] with the one internal
//! timer the state machine owns: the flicker window armed by the fall
//! completion. State lives behind `Rc<RefCell<_>>` and the timer task only
//! holds a `Weak`, so a timer that outlives its sequencer finds nothing to
//! mutate.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::observability::metrics;
use crate::scheduler::{CancelToken, Scheduler};

use super::state::{Outcome, Phase, PhaseTransition, SequencerState, Signal, TimedTransition};
use super::visual::{CycleTiming, VisualParams};

/// Default flicker window opened by the fall completion.
pub const FLICKER_WINDOW: Duration = Duration::from_millis(4000);

/// Tunables fixed for the lifetime of one sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerOptions {
    /// How long the flicker window stays open after the fall completes
    pub flicker_window: Duration,
    /// Flicker and settle cycle timing reported in visual params
    pub cycle: CycleTiming,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            flicker_window: FLICKER_WINDOW,
            cycle: CycleTiming::default(),
        }
    }
}

// ============================================================================
// Shared core
// ============================================================================

#[derive(Debug)]
struct Shared {
    state: SequencerState,
    pending: Option<(CancelToken, TimedTransition)>,
    /// Transitions applied outside a direct handler call, oldest first.
    journal: VecDeque<PhaseTransition>,
    entered_at: [Option<Duration>; Phase::ALL.len()],
    flicker_opened_at: Option<Duration>,
}

struct Core<S: Scheduler + 'static> {
    shared: RefCell<Shared>,
    scheduler: S,
    options: SequencerOptions,
}

impl<S: Scheduler + 'static> Core<S> {
    /// Applies `signal` and performs its side effects: logging, metrics,
    /// and arming or disarming the flicker timer.
    fn deliver(self: &Rc<Self>, signal: Signal) -> Outcome {
        let now = self.scheduler.now();
        let mut shared = self.shared.borrow_mut();
        let before = shared.state;
        let outcome = shared.state.apply(signal);
        debug_assert!(
            shared.state.is_consistent(),
            "inconsistent state {:?}",
            shared.state
        );

        if outcome.is_ignored() {
            debug!(%signal, phase = %before.phase, "signal ignored");
            metrics::record_signal_ignored(signal);
            return outcome;
        }

        for transition in outcome.transitions() {
            shared.entered_at[transition.to.index()] = Some(now);
            info!(
                from = %transition.from,
                to = %transition.to,
                reason = %transition.signal,
                "phase transition"
            );
            metrics::record_phase_transition(transition.to);
            metrics::set_current_phase(transition.to, Some(transition.from));
        }

        match signal {
            Signal::FallComplete => {
                let timed = TimedTransition {
                    from: Phase::Swinging,
                    to: Phase::Steady,
                    delay: self.options.flicker_window,
                };
                let weak = Rc::downgrade(self);
                let token = self
                    .scheduler
                    .schedule_once(timed.delay, Box::new(move || Self::fire(&weak)));
                shared.pending = Some((token, timed));
                shared.flicker_opened_at = Some(now);
                debug!(%token, delay = ?timed.delay, "flicker window opened");
            }
            Signal::FlickerTimeout => {
                // A direct call beats the timer; the timer must not fire later.
                if let Some((token, _)) = shared.pending.take() {
                    if self.scheduler.cancel(token) {
                        metrics::record_timer_cancelled();
                    }
                }
                debug!(swing_complete = shared.state.swing_complete, "flicker window closed");
            }
            Signal::SwingComplete => {}
        }

        outcome
    }

    fn fire(weak: &Weak<Self>) {
        let Some(core) = weak.upgrade() else {
            trace!("flicker timer fired after teardown");
            return;
        };
        core.shared.borrow_mut().pending = None;
        let outcome = core.deliver(Signal::FlickerTimeout);
        core.shared
            .borrow_mut()
            .journal
            .extend(outcome.into_transitions());
    }

    fn deliver_to_journal(self: &Rc<Self>, signal: Signal) -> Outcome {
        let outcome = self.deliver(signal);
        self.shared
            .borrow_mut()
            .journal
            .extend(outcome.transitions().iter().copied());
        outcome
    }

    fn cancel_pending(&self) -> Option<CancelToken> {
        let (token, _) = self.shared.borrow_mut().pending.take()?;
        if self.scheduler.cancel(token) {
            metrics::record_timer_cancelled();
        }
        debug!(%token, "pending timer cancelled");
        Some(token)
    }
}

// ============================================================================
// AnimationSequencer
// ============================================================================

/// The fuse and lightbulb phase sequencer.
///
/// Created by [`start`](Self::start) in [`Phase::Falling`]. The animation
/// runtime reports completions through [`on_fall_complete`] and
/// [`on_swing_complete`]; the flicker window is timed internally on the
/// supplied scheduler. Swing completion and the window timeout race to
/// settle the sequence, and whichever arrives last moves it to
/// [`Phase::Steady`].
///
/// Dropping the sequencer (or calling [`teardown`](Self::teardown)) cancels
/// the pending timer.
///
/// [`on_fall_complete`]: Self::on_fall_complete
/// [`on_swing_complete`]: Self::on_swing_complete
pub struct AnimationSequencer<S: Scheduler + 'static> {
    core: Rc<Core<S>>,
}

impl<S: Scheduler + 'static> AnimationSequencer<S> {
    /// Activates a sequencer in the `Falling` phase.
    #[must_use]
    pub fn start(scheduler: S, options: SequencerOptions) -> Self {
        let now = scheduler.now();
        let mut entered_at = [None; Phase::ALL.len()];
        entered_at[Phase::Falling.index()] = Some(now);

        let core = Rc::new(Core {
            shared: RefCell::new(Shared {
                state: SequencerState::initial(),
                pending: None,
                journal: VecDeque::new(),
                entered_at,
                flicker_opened_at: None,
            }),
            scheduler,
            options,
        });

        info!(flicker_window = ?options.flicker_window, "sequence started");
        metrics::set_current_phase(Phase::Falling, None);
        Self { core }
    }

    /// Activates a sequencer with default options.
    #[must_use]
    pub fn with_defaults(scheduler: S) -> Self {
        Self::start(scheduler, SequencerOptions::default())
    }

    /// The projectile animation finished.
    ///
    /// From `Falling`: passes through `Impact` into `Swinging`, opens the
    /// flicker window and arms its timer. Ignored in any other phase.
    pub fn on_fall_complete(&mut self) -> Outcome {
        self.core.deliver(Signal::FallComplete)
    }

    /// The pendulum animation finished.
    ///
    /// From `Swinging`: moves to `Flickering` while the window is open,
    /// otherwise straight to `Steady`. Ignored in any other phase and on
    /// repeat calls.
    pub fn on_swing_complete(&mut self) -> Outcome {
        self.core.deliver(Signal::SwingComplete)
    }

    /// Closes the flicker window.
    ///
    /// Normally invoked by the internal timer. Calling it directly closes
    /// the window early and cancels the timer so it cannot fire again.
    pub fn on_flicker_timeout(&mut self) -> Outcome {
        self.core.deliver(Signal::FlickerTimeout)
    }

    /// Render descriptor for the current state. Never mutates.
    #[must_use]
    pub fn current_visual_params(&self) -> VisualParams {
        VisualParams::derive(&self.state(), &self.core.options.cycle)
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SequencerState {
        self.core.shared.borrow().state
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    /// Returns whether the sequence has settled.
    #[must_use]
    pub fn is_steady(&self) -> bool {
        self.phase().is_terminal()
    }

    /// The armed flicker timer, if any.
    #[must_use]
    pub fn pending_timer(&self) -> Option<(CancelToken, TimedTransition)> {
        self.core.shared.borrow().pending
    }

    /// Scheduler time at which `phase` was entered, if it has been.
    #[must_use]
    pub fn phase_entered_at(&self, phase: Phase) -> Option<Duration> {
        self.core.shared.borrow().entered_at[phase.index()]
    }

    /// Scheduler time at which the flicker window opened.
    #[must_use]
    pub fn flicker_opened_at(&self) -> Option<Duration> {
        self.core.shared.borrow().flicker_opened_at
    }

    /// Options the sequencer was started with.
    #[must_use]
    pub fn options(&self) -> &SequencerOptions {
        &self.core.options
    }

    /// Current time on the sequencer's scheduler.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.core.scheduler.now()
    }

    /// Takes transitions applied by timers and handles since the last
    /// drain. Direct handler calls return theirs instead.
    pub fn drain_transitions(&mut self) -> Vec<PhaseTransition> {
        self.core.shared.borrow_mut().journal.drain(..).collect()
    }

    /// Weak handle for collaborators that report completions.
    #[must_use]
    pub fn handle(&self) -> SequencerHandle<S> {
        SequencerHandle {
            core: Rc::downgrade(&self.core),
        }
    }

    /// Tears the sequencer down, cancelling the pending timer.
    ///
    /// Returns the token that was cancelled, if one was pending.
    pub fn teardown(self) -> Option<CancelToken> {
        let cancelled = self.core.cancel_pending();
        info!(phase = %self.phase(), "sequencer torn down");
        cancelled
    }
}

impl<S: Scheduler + 'static> Drop for AnimationSequencer<S> {
    fn drop(&mut self) {
        self.core.cancel_pending();
    }
}

impl<S: Scheduler + 'static> std::fmt::Debug for AnimationSequencer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.core.shared.borrow();
        f.debug_struct("AnimationSequencer")
            .field("state", &shared.state)
            .field("pending", &shared.pending)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SequencerHandle
// ============================================================================

/// Non-owning handle that reports completions to a sequencer.
///
/// Every call is a no-op returning `None` once the sequencer is gone.
/// Transitions it causes are queued for
/// [`AnimationSequencer::drain_transitions`].
pub struct SequencerHandle<S: Scheduler + 'static> {
    core: Weak<Core<S>>,
}

impl<S: Scheduler + 'static> SequencerHandle<S> {
    /// Reports the projectile animation finished.
    pub fn fall_complete(&self) -> Option<Outcome> {
        self.core
            .upgrade()
            .map(|core| core.deliver_to_journal(Signal::FallComplete))
    }

    /// Reports the pendulum animation finished.
    pub fn swing_complete(&self) -> Option<Outcome> {
        self.core
            .upgrade()
            .map(|core| core.deliver_to_journal(Signal::SwingComplete))
    }

    /// Returns whether the sequencer still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.core.strong_count() > 0
    }
}

impl<S: Scheduler + 'static> Clone for SequencerHandle<S> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}

impl<S: Scheduler + 'static> std::fmt::Debug for SequencerHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ManualScheduler, SchedulerRecord};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn started() -> (Rc<ManualScheduler>, AnimationSequencer<Rc<ManualScheduler>>) {
        let scheduler = Rc::new(ManualScheduler::new());
        let sequencer = AnimationSequencer::with_defaults(Rc::clone(&scheduler));
        (scheduler, sequencer)
    }

    #[test]
    fn test_start_is_falling_without_timers() {
        let (scheduler, sequencer) = started();
        assert_eq!(sequencer.state(), SequencerState::initial());
        assert!(sequencer.pending_timer().is_none());
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(sequencer.phase_entered_at(Phase::Falling), Some(Duration::ZERO));
    }

    #[test]
    fn test_fall_complete_arms_flicker_timer() {
        let (scheduler, mut sequencer) = started();
        scheduler.advance(ms(700));
        let outcome = sequencer.on_fall_complete();
        assert_eq!(outcome.transitions().len(), 2);
        assert_eq!(sequencer.phase(), Phase::Swinging);

        let (token, timed) = sequencer.pending_timer().unwrap();
        assert_eq!(timed.delay, FLICKER_WINDOW);
        assert_eq!(timed.to, Phase::Steady);
        assert_eq!(scheduler.deadline(token), Some(ms(4700)));
        assert_eq!(sequencer.flicker_opened_at(), Some(ms(700)));
        assert_eq!(sequencer.phase_entered_at(Phase::Impact), Some(ms(700)));
    }

    #[test]
    fn test_second_fall_complete_schedules_nothing() {
        let (scheduler, mut sequencer) = started();
        sequencer.on_fall_complete();
        assert!(sequencer.on_fall_complete().is_ignored());
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn test_timer_settles_after_swing() {
        let (scheduler, mut sequencer) = started();
        sequencer.on_fall_complete();
        sequencer.on_swing_complete();
        assert_eq!(sequencer.phase(), Phase::Flickering);

        scheduler.advance(ms(3999));
        assert_eq!(sequencer.phase(), Phase::Flickering);
        scheduler.advance(ms(1));
        assert!(sequencer.is_steady());
        assert!(!sequencer.state().flicker_active);
        assert!(sequencer.pending_timer().is_none());

        let drained = sequencer.drain_transitions();
        assert_eq!(
            drained,
            vec![PhaseTransition {
                from: Phase::Flickering,
                to: Phase::Steady,
                signal: Signal::FlickerTimeout,
            }]
        );
        assert!(sequencer.drain_transitions().is_empty());
    }

    #[test]
    fn test_direct_timeout_cancels_timer() {
        let (scheduler, mut sequencer) = started();
        sequencer.on_fall_complete();
        let (token, _) = sequencer.pending_timer().unwrap();

        let outcome = sequencer.on_flicker_timeout();
        assert!(outcome.transitions().is_empty());
        assert!(!scheduler.is_pending(token));
        assert!(sequencer.pending_timer().is_none());

        scheduler.advance(ms(10_000));
        assert!(!scheduler.has_fired(token));
        assert!(sequencer.on_flicker_timeout().is_ignored());
    }

    #[test]
    fn test_drop_cancels_pending_timer() {
        let (scheduler, mut sequencer) = started();
        sequencer.on_fall_complete();
        let (token, _) = sequencer.pending_timer().unwrap();
        drop(sequencer);

        assert!(scheduler.cancelled_tokens().contains(&token));
        scheduler.advance(ms(5000));
        assert!(!scheduler.has_fired(token));
    }

    #[test]
    fn test_teardown_returns_cancelled_token() {
        let (scheduler, mut sequencer) = started();
        sequencer.on_fall_complete();
        let (token, _) = sequencer.pending_timer().unwrap();

        assert_eq!(sequencer.teardown(), Some(token));
        // Drop after teardown must not cancel a second time.
        let cancels = scheduler
            .records()
            .iter()
            .filter(|r| matches!(r, SchedulerRecord::Cancelled { .. }))
            .count();
        assert_eq!(cancels, 1);
    }

    #[test]
    fn test_teardown_without_timer() {
        let (_scheduler, sequencer) = started();
        assert_eq!(sequencer.teardown(), None);
    }

    #[test]
    fn test_handle_reports_into_journal() {
        let (_scheduler, mut sequencer) = started();
        let handle = sequencer.handle();
        assert!(handle.is_alive());

        let outcome = handle.fall_complete().unwrap();
        assert_eq!(outcome.transitions().len(), 2);
        assert_eq!(sequencer.drain_transitions().len(), 2);
        assert!(handle.fall_complete().unwrap().is_ignored());

        drop(sequencer);
        assert!(!handle.is_alive());
        assert!(handle.swing_complete().is_none());
    }

    #[test]
    fn test_visual_params_follow_state() {
        let (scheduler, mut sequencer) = started();
        assert!(sequencer.current_visual_params().projectile_visible);
        sequencer.on_fall_complete();
        assert!(sequencer.current_visual_params().halo_keyframes.is_some());
        sequencer.on_swing_complete();
        scheduler.advance(FLICKER_WINDOW);
        let params = sequencer.current_visual_params();
        assert_eq!(params.phase, Phase::Steady);
        assert_eq!(params.playback.repeat, 0);
    }

    #[test]
    fn test_custom_flicker_window() {
        let scheduler = Rc::new(ManualScheduler::new());
        let options = SequencerOptions {
            flicker_window: ms(1000),
            ..SequencerOptions::default()
        };
        let mut sequencer = AnimationSequencer::start(Rc::clone(&scheduler), options);
        sequencer.on_fall_complete();
        scheduler.advance(ms(1000));
        assert!(!sequencer.state().flicker_active);
        assert_eq!(sequencer.phase(), Phase::Swinging);
    }
}
