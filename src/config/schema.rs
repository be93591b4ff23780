//! Configuration schema
//!
//! Typed form of the YAML configuration file. Every key is optional and
//! falls back to the built-in timing of the animation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::animation::{PENDULUM_DURATION, PROJECTILE_DURATION, Timelines};
use crate::sequencer::{CycleTiming, FLICKER_WINDOW, SequencerOptions};

/// Default frame rate for real-time playback.
pub const DEFAULT_FPS: u32 = 30;

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FuseConfig {
    /// Animation and sequencer timing
    pub timing: TimingConfig,
    /// Playback settings
    pub render: RenderConfig,
}

/// Durations and repeat counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Projectile flight time
    #[serde(with = "humantime_duration")]
    pub fall: Duration,
    /// Pendulum swing time
    #[serde(with = "humantime_duration")]
    pub swing: Duration,
    /// Flicker window opened on impact
    #[serde(with = "humantime_duration")]
    pub flicker_window: Duration,
    /// One flicker cycle
    #[serde(with = "humantime_duration")]
    pub flicker_cycle: Duration,
    /// Flicker cycle repeats
    pub flicker_repeat: u32,
    /// Transition into a settled look
    #[serde(with = "humantime_duration")]
    pub settle_transition: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let cycle = CycleTiming::default();
        Self {
            fall: PROJECTILE_DURATION,
            swing: PENDULUM_DURATION,
            flicker_window: FLICKER_WINDOW,
            flicker_cycle: cycle.flicker_cycle,
            flicker_repeat: cycle.flicker_repeat,
            settle_transition: cycle.settle,
        }
    }
}

impl TimingConfig {
    /// Sequencer options for this timing.
    #[must_use]
    pub const fn sequencer_options(&self) -> SequencerOptions {
        SequencerOptions {
            flicker_window: self.flicker_window,
            cycle: CycleTiming {
                flicker_cycle: self.flicker_cycle,
                flicker_repeat: self.flicker_repeat,
                settle: self.settle_transition,
            },
        }
    }

    /// Motion timelines for this timing.
    #[must_use]
    pub fn timelines(&self) -> Timelines {
        Timelines::new(self.fall, self.swing)
    }
}

/// Real-time playback settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Frames per second
    pub fps: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { fps: DEFAULT_FPS }
    }
}

/// Serde adapter for durations written as `700ms`, `4s` and similar.
pub(crate) mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
