//! Visual parameters derived from sequencer state
//!
//! [`VisualParams::derive`] is a pure mapping from the three state fields
//! to the keyframe descriptors a renderer paints. It never reads a clock;
//! per-frame interpolation inside a flicker cycle is done by
//! [`VisualParams::sample`] with a progress value the caller supplies.

use std::time::Duration;

use serde::Serialize;

use crate::animation::keyframes::{KeyframeTrack, even_offsets};
use crate::animation::{Color, Easing};

use super::state::{Phase, SequencerState};

/// Bulb opacity during a flicker cycle.
const FLICKER_OPACITY: [f32; 7] = [1.0, 0.4, 1.0, 0.3, 1.0, 0.5, 1.0];
/// Filament color during a flicker cycle.
const FLICKER_COLORS: [Color; 6] = [
    Color::GRAY,
    Color::GOLD,
    Color::GRAY,
    Color::GOLD,
    Color::GRAY,
    Color::GOLD,
];
/// Brightness multiplier during a flicker cycle.
const FLICKER_BRIGHTNESS: [f32; 4] = [1.0, 1.5, 1.0, 1.5];
/// Halo opacity during a flicker cycle.
const FLICKER_HALO: [f32; 6] = [0.3, 0.7, 0.4, 0.8, 0.5, 1.0];

const LIT_BRIGHTNESS: f32 = 1.5;
const LIT_HALO: f32 = 0.7;

/// Flicker and settle cycle timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTiming {
    /// Length of one flicker cycle
    pub flicker_cycle: Duration,
    /// Number of times the flicker cycle repeats
    pub flicker_repeat: u32,
    /// Length of the single transition into a settled look
    pub settle: Duration,
}

impl Default for CycleTiming {
    fn default() -> Self {
        Self {
            flicker_cycle: Duration::from_millis(500),
            flicker_repeat: 8,
            settle: Duration::from_millis(300),
        }
    }
}

/// How a keyframe set plays back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Playback {
    /// Length of one pass over the keyframes in milliseconds
    pub duration_ms: u64,
    /// Extra passes after the first
    pub repeat: u32,
}

/// Headline text appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Headline {
    /// Text color
    pub color: Color,
    /// Warm glow behind the text
    pub text_shadow: Option<Color>,
}

/// Everything a renderer needs to paint the scene for one state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualParams {
    /// Phase the parameters were derived for
    pub phase: Phase,
    /// Bulb opacity keyframes
    pub opacity_keyframes: Vec<f32>,
    /// Filament color keyframes
    pub color_keyframes: Vec<Color>,
    /// Brightness multiplier keyframes
    pub brightness_keyframes: Vec<f32>,
    /// Peak glow strength in `[0, 1]`
    pub glow_intensity: f32,
    /// Halo opacity keyframes; `None` when the halo is not shown
    pub halo_keyframes: Option<Vec<f32>>,
    /// Playback of the keyframe sets above
    pub playback: Playback,
    /// Whether the projectile is drawn
    pub projectile_visible: bool,
    /// Whether the pendulum animation is running
    pub pendulum_active: bool,
    /// Headline text appearance
    pub headline: Headline,
}

/// Interpolated bulb values at one point of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BulbSample {
    /// Bulb opacity
    pub opacity: f32,
    /// Filament color
    pub color: Color,
    /// Brightness multiplier
    pub brightness: f32,
    /// Halo opacity, if the halo is shown
    pub halo_opacity: Option<f32>,
}

impl VisualParams {
    /// Derives the render descriptor for `state`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn derive(state: &SequencerState, timing: &CycleTiming) -> Self {
        let lit = state.swing_complete;

        let (opacity, colors, brightness, glow, halo, playback) = if state.flicker_active {
            (
                FLICKER_OPACITY.to_vec(),
                FLICKER_COLORS.to_vec(),
                FLICKER_BRIGHTNESS.to_vec(),
                1.0,
                Some(FLICKER_HALO.to_vec()),
                Playback {
                    duration_ms: timing.flicker_cycle.as_millis() as u64,
                    repeat: timing.flicker_repeat,
                },
            )
        } else {
            let settled = Playback {
                duration_ms: timing.settle.as_millis() as u64,
                repeat: 0,
            };
            if lit {
                (
                    vec![1.0],
                    vec![Color::GOLD],
                    vec![LIT_BRIGHTNESS],
                    LIT_HALO,
                    Some(vec![LIT_HALO]),
                    settled,
                )
            } else {
                (vec![1.0], vec![Color::GRAY], vec![1.0], 0.0, None, settled)
            }
        };

        let headline = if lit {
            Headline {
                color: Color::WHITE,
                text_shadow: Some(Color::AMBER),
            }
        } else {
            Headline {
                color: Color::GRAY,
                text_shadow: None,
            }
        };

        Self {
            phase: state.phase,
            opacity_keyframes: opacity,
            color_keyframes: colors,
            brightness_keyframes: brightness,
            glow_intensity: glow,
            halo_keyframes: halo,
            playback,
            projectile_visible: state.phase == Phase::Falling,
            pendulum_active: matches!(state.phase, Phase::Impact | Phase::Swinging),
            headline,
        }
    }

    /// Interpolates the bulb keyframes at `cycle_progress` in `[0, 1]`.
    #[must_use]
    pub fn sample(&self, cycle_progress: f32) -> BulbSample {
        BulbSample {
            opacity: track(&self.opacity_keyframes).sample(cycle_progress),
            color: track(&self.color_keyframes).sample(cycle_progress),
            brightness: track(&self.brightness_keyframes).sample(cycle_progress),
            halo_opacity: self
                .halo_keyframes
                .as_deref()
                .map(|halo| track(halo).sample(cycle_progress)),
        }
    }

    /// Total playback length: one pass plus repeats.
    #[must_use]
    pub fn total_playback(&self) -> Duration {
        Duration::from_millis(self.playback.duration_ms)
            .saturating_mul(self.playback.repeat.saturating_add(1))
    }
}

fn track<T: crate::animation::Interpolate>(values: &[T]) -> KeyframeTrack<T> {
    KeyframeTrack::from_table(values, &even_offsets(values.len()), Easing::Linear)
}
