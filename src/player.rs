//! Real-time playback
//!
//! Drives a sequencer on a [`TokioScheduler`] inside a `LocalSet`, sampling
//! frames at a fixed rate and translating state changes into structured
//! events. Playback ends when the sequence settles, when an optional
//! teardown deadline passes, or when [`Shutdown`] is triggered.

use std::rc::Rc;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::Utc;
use tokio::task::LocalSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::animation::{SimulatedRuntime, Timelines};
use crate::config::FuseConfig;
use crate::error::FuseLightError;
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter, RunSummary, StopReason};
use crate::render::{Renderer, sample_frame};
use crate::scheduler::TokioScheduler;
use crate::sequencer::{AnimationSequencer, Phase, SequencerState};

/// Cooperative stop request shared between the signal handler and the
/// playback loop. The first reason recorded wins.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    reason: Arc<OnceLock<StopReason>>,
}

impl Shutdown {
    /// Creates an untriggered shutdown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop for `reason`.
    pub fn trigger(&self, reason: StopReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    /// Reason recorded by the first [`trigger`](Self::trigger), if any.
    #[must_use]
    pub fn reason(&self) -> Option<StopReason> {
        self.reason.get().copied()
    }

    /// Completes once a stop has been requested.
    pub async fn triggered(&self) {
        self.token.cancelled().await;
    }
}

/// How playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayEnd {
    /// The sequence reached `Steady`.
    Settled,
    /// The sequencer was torn down early.
    Stopped(StopReason),
}

/// Outcome of one playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayReport {
    /// How playback ended
    pub end: PlayEnd,
    /// Phase when playback ended
    pub final_phase: Phase,
    /// Run totals
    pub summary: RunSummary,
}

/// Plays one sequence in real time.
///
/// `teardown_after` bounds the run; the sequencer is torn down at the
/// first frame at or past that time.
///
/// # Errors
///
/// Returns [`FuseLightError::Io`] if the renderer fails.
pub async fn play(
    config: &FuseConfig,
    renderer: &mut dyn Renderer,
    emitter: &EventEmitter,
    shutdown: &Shutdown,
    teardown_after: Option<Duration>,
) -> Result<PlayReport, FuseLightError> {
    LocalSet::new()
        .run_until(play_local(config, renderer, emitter, shutdown, teardown_after))
        .await
}

#[allow(clippy::cast_possible_truncation)]
async fn play_local(
    config: &FuseConfig,
    renderer: &mut dyn Renderer,
    emitter: &EventEmitter,
    shutdown: &Shutdown,
    teardown_after: Option<Duration>,
) -> Result<PlayReport, FuseLightError> {
    let scheduler = Rc::new(TokioScheduler::new());
    let timelines = config.timing.timelines();
    let options = config.timing.sequencer_options();
    let mut sequencer = AnimationSequencer::start(Rc::clone(&scheduler), options);
    let runtime = SimulatedRuntime::start(Rc::clone(&scheduler), sequencer.handle(), &timelines);

    emitter.emit(Event::SequenceStarted {
        timestamp: Utc::now(),
        flicker_window_ms: options.flicker_window.as_millis() as u64,
        fps: config.render.fps,
    });

    let mut ticker = tokio::time::interval(frame_period(config.render.fps));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut observer = StateObserver::new(sequencer.state());
    let mut frames = 0_u64;

    let end = loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = shutdown.triggered() => {
                break PlayEnd::Stopped(shutdown.reason().unwrap_or(StopReason::Interrupted));
            }
        }

        observer.observe(&mut sequencer, emitter);
        render_frame(&sequencer, &timelines, renderer, &mut frames)?;

        if sequencer.is_steady() {
            break PlayEnd::Settled;
        }
        if teardown_after.is_some_and(|limit| sequencer.now() >= limit) {
            break PlayEnd::Stopped(StopReason::Deadline);
        }
    };

    let final_phase = sequencer.phase();
    let elapsed = sequencer.now();
    runtime.stop();

    match end {
        PlayEnd::Settled => {
            // One more frame once the settle transition has played out.
            tokio::time::sleep(options.cycle.settle).await;
            render_frame(&sequencer, &timelines, renderer, &mut frames)?;
        }
        PlayEnd::Stopped(reason) => {
            let cancelled_timer = sequencer.teardown().is_some();
            info!(?reason, phase = %final_phase, "playback stopped");
            emitter.emit(Event::SequenceTornDown {
                timestamp: Utc::now(),
                phase: final_phase,
                reason,
                cancelled_timer,
            });
        }
    }
    renderer.finish()?;

    let summary = RunSummary {
        frames_rendered: frames,
        phase_transitions: observer.transitions,
        duration_ms: elapsed.as_millis() as u64,
    };
    if end == PlayEnd::Settled {
        info!(frames, duration_ms = summary.duration_ms, "sequence settled");
        emitter.emit(Event::SequenceSettled {
            timestamp: Utc::now(),
            summary,
        });
    }

    Ok(PlayReport {
        end,
        final_phase,
        summary,
    })
}

fn render_frame(
    sequencer: &AnimationSequencer<Rc<TokioScheduler>>,
    timelines: &Timelines,
    renderer: &mut dyn Renderer,
    frames: &mut u64,
) -> Result<(), FuseLightError> {
    let frame = sample_frame(sequencer, timelines, *frames);
    renderer.render(&frame)?;
    metrics::record_frame_rendered();
    *frames += 1;
    Ok(())
}

/// Interval between frames at `fps`, which must be non-zero.
#[must_use]
pub fn frame_period(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

/// Turns drained transitions and flag edges into events.
#[derive(Debug)]
struct StateObserver {
    last: SequencerState,
    transitions: u64,
}

impl StateObserver {
    const fn new(initial: SequencerState) -> Self {
        Self {
            last: initial,
            transitions: 0,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn observe(
        &mut self,
        sequencer: &mut AnimationSequencer<Rc<TokioScheduler>>,
        emitter: &EventEmitter,
    ) {
        let elapsed_ms = sequencer.now().as_millis() as u64;
        let state = sequencer.state();

        for transition in sequencer.drain_transitions() {
            debug!(from = %transition.from, to = %transition.to, "observed transition");
            self.transitions += 1;
            emitter.emit(Event::phase_entered(&transition, elapsed_ms));
        }

        if state.flicker_active && !self.last.flicker_active {
            emitter.emit(Event::FlickerStarted {
                timestamp: Utc::now(),
                elapsed_ms,
            });
        }
        if !state.flicker_active && self.last.flicker_active {
            emitter.emit(Event::FlickerEnded {
                timestamp: Utc::now(),
                swing_complete: state.swing_complete,
                elapsed_ms,
            });
        }
        self.last = state;
    }
}
