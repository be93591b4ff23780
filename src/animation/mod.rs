//! Animation primitives
//!
//! Easing curves, keyframe tracks, the projectile and pendulum timelines,
//! and a runtime that reports their completions to the sequencer.

pub mod easing;
pub mod keyframes;
pub mod runtime;
pub mod timeline;
pub mod values;

pub use easing::Easing;
pub use keyframes::{KeyframeError, KeyframeTrack, progress};
pub use runtime::SimulatedRuntime;
pub use timeline::{PENDULUM_DURATION, PROJECTILE_DURATION, ProjectileSample, Timelines};
pub use values::{Color, Interpolate, ParseColorError};
