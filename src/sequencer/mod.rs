//! Phase sequencer for the fuse and lightbulb animation
//!
//! # Architecture
//!
//! - [`state`]: phases, signals and the pure guarded transition function
//! - [`engine`]: [`AnimationSequencer`], which owns the state and the
//!   flicker-window timer
//! - [`visual`]: the pure mapping from state to render parameters
//!
//! The sequencer is single-threaded and `!Send`. The animation runtime
//! reports the two completion events; the flicker window is the only timer
//! the sequencer arms itself.

pub mod engine;
pub mod state;
pub mod visual;

pub use engine::{AnimationSequencer, FLICKER_WINDOW, SequencerHandle, SequencerOptions};
pub use state::{Outcome, Phase, PhaseTransition, SequencerState, Signal, TimedTransition};
pub use visual::{BulbSample, CycleTiming, Headline, Playback, VisualParams};
