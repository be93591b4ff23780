//! End-to-end sequencer behavior against the instrumented manual clock.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use fuselight::scheduler::{CancelToken, ManualScheduler, Scheduler, TimerTask};
use fuselight::sequencer::{AnimationSequencer, FLICKER_WINDOW, Phase, SequencerState};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn start() -> (Rc<ManualScheduler>, AnimationSequencer<Rc<ManualScheduler>>) {
    let scheduler = Rc::new(ManualScheduler::new());
    let sequencer = AnimationSequencer::with_defaults(Rc::clone(&scheduler));
    (scheduler, sequencer)
}

#[test]
fn swing_inside_flicker_window_waits_for_timeout() {
    let (scheduler, mut sequencer) = start();
    sequencer.on_fall_complete();
    sequencer.on_swing_complete();

    assert_eq!(
        sequencer.state(),
        SequencerState {
            phase: Phase::Flickering,
            swing_complete: true,
            flicker_active: true,
        }
    );

    scheduler.advance(FLICKER_WINDOW);
    assert_eq!(
        sequencer.state(),
        SequencerState {
            phase: Phase::Steady,
            swing_complete: true,
            flicker_active: false,
        }
    );
    assert_eq!(scheduler.fired_count(), 1);
}

#[test]
fn timeout_before_swing_settles_directly() {
    let (scheduler, mut sequencer) = start();
    sequencer.on_fall_complete();

    scheduler.advance(ms(4000));
    assert_eq!(sequencer.phase(), Phase::Swinging);
    assert!(!sequencer.state().flicker_active);

    // Stays put for as long as the swing takes.
    scheduler.advance(ms(60_000));
    assert_eq!(sequencer.phase(), Phase::Swinging);

    let outcome = sequencer.on_swing_complete();
    let transition = outcome.transitions()[0];
    assert_eq!(transition.from, Phase::Swinging);
    assert_eq!(transition.to, Phase::Steady);
    assert!(sequencer.phase_entered_at(Phase::Flickering).is_none());
}

#[test]
fn teardown_cancels_flicker_timer() {
    let (scheduler, mut sequencer) = start();
    sequencer.on_fall_complete();
    let (token, _) = sequencer.pending_timer().expect("timer armed");

    scheduler.advance(ms(1000));
    let cancelled = sequencer.teardown();

    assert_eq!(cancelled, Some(token));
    assert_eq!(scheduler.cancelled_tokens(), vec![token]);
    scheduler.advance(ms(10_000));
    assert!(!scheduler.has_fired(token));
    assert_eq!(scheduler.fired_count(), 0);
}

#[test]
fn repeated_and_early_signals_are_ignored() {
    let (scheduler, mut sequencer) = start();

    assert!(sequencer.on_swing_complete().is_ignored());
    assert!(sequencer.on_flicker_timeout().is_ignored());
    assert_eq!(sequencer.state(), SequencerState::initial());

    sequencer.on_fall_complete();
    let after_fall = sequencer.state();
    assert!(sequencer.on_fall_complete().is_ignored());
    assert_eq!(sequencer.state(), after_fall);
    assert_eq!(scheduler.pending_count(), 1);
}

#[test]
fn steady_ignores_everything() {
    let (scheduler, mut sequencer) = start();
    sequencer.on_fall_complete();
    sequencer.on_swing_complete();
    scheduler.advance(FLICKER_WINDOW);
    assert!(sequencer.is_steady());

    assert!(sequencer.on_fall_complete().is_ignored());
    assert!(sequencer.on_swing_complete().is_ignored());
    assert!(sequencer.on_flicker_timeout().is_ignored());
    assert!(sequencer.is_steady());
}

#[test]
fn visual_params_are_pure() {
    let (_scheduler, mut sequencer) = start();
    sequencer.on_fall_complete();
    let state = sequencer.state();
    let first = sequencer.current_visual_params();
    for _ in 0..100 {
        assert_eq!(sequencer.current_visual_params(), first);
    }
    assert_eq!(sequencer.state(), state);
}

/// Scheduler whose `cancel` does nothing, so tasks always run.
struct LeakyScheduler {
    inner: ManualScheduler,
    cancel_calls: RefCell<Vec<CancelToken>>,
}

impl Scheduler for LeakyScheduler {
    fn schedule_once(&self, delay: Duration, task: TimerTask) -> CancelToken {
        self.inner.schedule_once(delay, task)
    }

    fn cancel(&self, token: CancelToken) -> bool {
        self.cancel_calls.borrow_mut().push(token);
        false
    }

    fn now(&self) -> Duration {
        self.inner.now()
    }
}

#[test]
fn timer_firing_after_teardown_is_a_noop() {
    let scheduler = Rc::new(LeakyScheduler {
        inner: ManualScheduler::new(),
        cancel_calls: RefCell::new(Vec::new()),
    });
    let mut sequencer = AnimationSequencer::with_defaults(Rc::clone(&scheduler));
    let handle = sequencer.handle();
    sequencer.on_fall_complete();
    drop(sequencer);

    assert_eq!(scheduler.cancel_calls.borrow().len(), 1);
    assert!(!handle.is_alive());

    // The leaked task still runs, but finds no sequencer.
    scheduler.inner.advance(ms(5000));
    assert_eq!(scheduler.inner.fired_count(), 1);
}
