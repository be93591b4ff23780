//! Projectile and pendulum timelines
//!
//! The two motion animations whose completion events drive the sequencer:
//! the projectile crossing the scene and the bulb's damped swing.

use std::time::Duration;

use serde::Serialize;

use super::easing::Easing;
use super::keyframes::KeyframeTrack;

/// Default projectile flight time.
pub const PROJECTILE_DURATION: Duration = Duration::from_millis(700);

/// Default pendulum swing time.
pub const PENDULUM_DURATION: Duration = Duration::from_millis(4000);

/// Swing angles in degrees, decaying toward rest.
const PENDULUM_ANGLES: [f32; 10] = [0.0, -45.0, 45.0, -30.0, 30.0, -15.0, 15.0, -5.0, 5.0, 0.0];
const PENDULUM_TIMES: [f32; 10] = [0.0, 0.1, 0.3, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 1.0];

const PROJECTILE_X: [f32; 2] = [200.0, -200.0];
const PROJECTILE_ROTATE: [f32; 2] = [0.0, 720.0];
const PROJECTILE_SCALE: [f32; 3] = [1.0, 1.1, 1.0];

/// Projectile transform at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectileSample {
    /// Horizontal offset in px from the scene center
    pub x: f32,
    /// Spin in degrees
    pub rotate: f32,
    /// Uniform scale
    pub scale: f32,
}

/// Motion timelines with their durations.
#[derive(Debug, Clone, PartialEq)]
pub struct Timelines {
    fall: Duration,
    swing: Duration,
    projectile_x: KeyframeTrack<f32>,
    projectile_rotate: KeyframeTrack<f32>,
    projectile_scale: KeyframeTrack<f32>,
    pendulum: KeyframeTrack<f32>,
}

impl Timelines {
    /// Builds the timelines with the given flight and swing durations.
    #[must_use]
    pub fn new(fall: Duration, swing: Duration) -> Self {
        Self {
            fall,
            swing,
            projectile_x: KeyframeTrack::from_table(&PROJECTILE_X, &[0.0, 1.0], Easing::EaseIn),
            projectile_rotate: KeyframeTrack::from_table(
                &PROJECTILE_ROTATE,
                &[0.0, 1.0],
                Easing::EaseIn,
            ),
            projectile_scale: KeyframeTrack::from_table(
                &PROJECTILE_SCALE,
                &[0.0, 0.5, 1.0],
                Easing::EaseIn,
            ),
            pendulum: KeyframeTrack::from_table(
                &PENDULUM_ANGLES,
                &PENDULUM_TIMES,
                Easing::EaseInOut,
            ),
        }
    }

    /// Projectile flight duration.
    #[must_use]
    pub const fn fall(&self) -> Duration {
        self.fall
    }

    /// Pendulum swing duration.
    #[must_use]
    pub const fn swing(&self) -> Duration {
        self.swing
    }

    /// Projectile transform `elapsed` after launch.
    #[must_use]
    pub fn projectile_at(&self, elapsed: Duration) -> ProjectileSample {
        ProjectileSample {
            x: self.projectile_x.sample_at(elapsed, self.fall),
            rotate: self.projectile_rotate.sample_at(elapsed, self.fall),
            scale: self.projectile_scale.sample_at(elapsed, self.fall),
        }
    }

    /// Pendulum angle in degrees `elapsed` after the swing began.
    #[must_use]
    pub fn pendulum_angle_at(&self, elapsed: Duration) -> f32 {
        self.pendulum.sample_at(elapsed, self.swing)
    }

    /// The swing's keyframe track.
    #[must_use]
    pub const fn pendulum_track(&self) -> &KeyframeTrack<f32> {
        &self.pendulum
    }
}

impl Default for Timelines {
    fn default() -> Self {
        Self::new(PROJECTILE_DURATION, PENDULUM_DURATION)
    }
}
