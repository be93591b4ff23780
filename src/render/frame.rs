//! Frame sampling from a running sequencer

use std::time::Duration;

use serde::Serialize;

use crate::animation::keyframes::progress;
use crate::animation::{ProjectileSample, Timelines};
use crate::scheduler::Scheduler;
use crate::sequencer::{AnimationSequencer, BulbSample, Phase, VisualParams};

/// One sampled instant of the scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Zero-based frame number
    pub index: u64,
    /// Milliseconds since the sequence started
    pub elapsed_ms: u64,
    /// Phase at sampling time
    pub phase: Phase,
    /// Render descriptor for the current state
    pub params: VisualParams,
    /// Bulb values interpolated inside the current cycle
    pub bulb: BulbSample,
    /// Projectile transform while it is visible
    pub projectile: Option<ProjectileSample>,
    /// Pendulum angle in degrees; zero at rest
    pub pendulum_angle: f32,
}

/// Samples `sequencer` at its scheduler's current time.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn sample_frame<S: Scheduler + 'static>(
    sequencer: &AnimationSequencer<S>,
    timelines: &Timelines,
    index: u64,
) -> Frame {
    let now = sequencer.now();
    let since = |at: Option<Duration>| now.saturating_sub(at.unwrap_or(now));

    let state = sequencer.state();
    let params = sequencer.current_visual_params();
    let elapsed = since(sequencer.phase_entered_at(Phase::Falling));

    let projectile = params
        .projectile_visible
        .then(|| timelines.projectile_at(elapsed));
    let pendulum_angle = if params.pendulum_active {
        timelines.pendulum_angle_at(since(sequencer.phase_entered_at(Phase::Impact)))
    } else {
        0.0
    };

    let cycle = if state.flicker_active {
        cycle_progress(since(sequencer.flicker_opened_at()), &params)
    } else {
        let settle = Duration::from_millis(params.playback.duration_ms);
        progress(since(sequencer.phase_entered_at(state.phase)), settle)
    };

    Frame {
        index,
        elapsed_ms: elapsed.as_millis() as u64,
        phase: state.phase,
        bulb: params.sample(cycle),
        params,
        projectile,
        pendulum_angle,
    }
}

/// Position inside the current playback cycle, in `[0, 1]`.
///
/// Repeating cycles wrap; once every repeat has played the last keyframe
/// holds.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn cycle_progress(elapsed: Duration, params: &VisualParams) -> f32 {
    let cycle = Duration::from_millis(params.playback.duration_ms);
    if cycle.is_zero() || elapsed >= params.total_playback() {
        return 1.0;
    }
    let within = Duration::from_nanos((elapsed.as_nanos() % cycle.as_nanos()) as u64);
    progress(within, cycle)
}
