//! Sequencer state representation
//!
//! The pure half of the sequencer: phases, the three-field state value and
//! the guarded transition function. Nothing here touches a clock; timers
//! are layered on top by [`AnimationSequencer`](super::AnimationSequencer).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One step of the fuse and lightbulb progression.
///
/// Variants are declared in progression order, so `Ord` gives the
/// one-way ordering every transition must respect.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The projectile is in flight toward the bulb.
    Falling,
    /// The projectile has struck the bulb's support.
    Impact,
    /// The bulb swings on its thread like a damped pendulum.
    Swinging,
    /// The swing is over but the flicker window is still open.
    Flickering,
    /// Terminal: the bulb is lit and still.
    Steady,
}

impl Phase {
    /// All phases in progression order.
    pub const ALL: [Self; 5] = [
        Self::Falling,
        Self::Impact,
        Self::Swinging,
        Self::Flickering,
        Self::Steady,
    ];

    /// Zero-based position in the progression.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name used in logs, events and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Falling => "falling",
            Self::Impact => "impact",
            Self::Swinging => "swinging",
            Self::Flickering => "flickering",
            Self::Steady => "steady",
        }
    }

    /// Returns whether no transition can leave this phase.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Steady)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External or timer-originated input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// The projectile animation finished.
    FallComplete,
    /// The pendulum animation finished.
    SwingComplete,
    /// The flicker window elapsed.
    FlickerTimeout,
}

impl Signal {
    /// Lowercase name used in logs and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FallComplete => "fall_complete",
            Self::SwingComplete => "swing_complete",
            Self::FlickerTimeout => "flicker_timeout",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one applied phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    /// Phase we left
    pub from: Phase,
    /// Phase we entered
    pub to: Phase,
    /// Signal whose handler performed the change
    pub signal: Signal,
}

/// A one-shot transition armed on a scheduler.
///
/// `from`/`to` name the settling this timer performs when it is the later
/// of the two settling signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedTransition {
    /// Phase the sequencer was in when the timer was armed
    pub from: Phase,
    /// Phase the timer may move the sequencer to
    pub to: Phase,
    /// Delay between arming and firing
    pub delay: Duration,
}

/// Result of feeding a [`Signal`] to [`SequencerState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The signal's precondition did not hold; state is unchanged.
    Ignored,
    /// The signal was consumed. Transitions may be empty when only a flag
    /// changed (a flicker timeout that arrives mid-swing).
    Accepted(Vec<PhaseTransition>),
}

impl Outcome {
    /// Returns whether the signal was ignored.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }

    /// Phase transitions performed, empty when ignored.
    #[must_use]
    pub fn transitions(&self) -> &[PhaseTransition] {
        match self {
            Self::Ignored => &[],
            Self::Accepted(transitions) => transitions,
        }
    }

    /// Consumes the outcome, returning its transitions.
    #[must_use]
    pub fn into_transitions(self) -> Vec<PhaseTransition> {
        match self {
            Self::Ignored => Vec::new(),
            Self::Accepted(transitions) => transitions,
        }
    }
}

/// The sequencer's entire mutable state.
///
/// Invariants, upheld by [`apply`](Self::apply):
/// - `flicker_active` implies phase is `Impact`, `Swinging` or `Flickering`
/// - `swing_complete` implies phase is `Flickering` or `Steady`
/// - phase only moves forward; `Steady` is absorbing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequencerState {
    /// Current phase
    pub phase: Phase,
    /// The pendulum animation has finished
    pub swing_complete: bool,
    /// The flicker window is open
    pub flicker_active: bool,
}

impl Default for SequencerState {
    fn default() -> Self {
        Self::initial()
    }
}

impl SequencerState {
    /// State on activation: falling, nothing completed, no flicker.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            phase: Phase::Falling,
            swing_complete: false,
            flicker_active: false,
        }
    }

    /// Returns whether the invariants hold for this value.
    ///
    /// Used to reject hand-built states (for example from CLI flags).
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        let flicker_ok = !self.flicker_active
            || matches!(
                self.phase,
                Phase::Impact | Phase::Swinging | Phase::Flickering
            );
        let swing_ok =
            !self.swing_complete || matches!(self.phase, Phase::Flickering | Phase::Steady);
        // Flickering is exactly "swing done, window open".
        let flickering_ok = !matches!(self.phase, Phase::Flickering)
            || (self.swing_complete && self.flicker_active);
        let steady_ok = !matches!(self.phase, Phase::Steady) || self.swing_complete;
        flicker_ok && swing_ok && flickering_ok && steady_ok
    }

    /// Feeds one signal through the guarded transition function.
    ///
    /// - `FallComplete`: only from `Falling`. Passes through `Impact` into
    ///   `Swinging` and opens the flicker window.
    /// - `SwingComplete`: only from `Swinging` with the swing not yet
    ///   complete. Settles to `Steady` if the window is closed, otherwise
    ///   waits in `Flickering`.
    /// - `FlickerTimeout`: only while the window is open. Closes it and
    ///   settles to `Steady` if the swing already completed.
    pub fn apply(&mut self, signal: Signal) -> Outcome {
        match signal {
            Signal::FallComplete => {
                if self.phase != Phase::Falling {
                    return Outcome::Ignored;
                }
                self.flicker_active = true;
                let impact = self.advance(Phase::Impact, signal);
                let swing = self.advance(Phase::Swinging, signal);
                Outcome::Accepted(impact.into_iter().chain(swing).collect())
            }
            Signal::SwingComplete => {
                if self.phase != Phase::Swinging || self.swing_complete {
                    return Outcome::Ignored;
                }
                self.swing_complete = true;
                let to = if self.flicker_active {
                    Phase::Flickering
                } else {
                    Phase::Steady
                };
                Outcome::Accepted(self.advance(to, signal).into_iter().collect())
            }
            Signal::FlickerTimeout => {
                if !self.flicker_active {
                    return Outcome::Ignored;
                }
                self.flicker_active = false;
                if self.swing_complete {
                    Outcome::Accepted(self.advance(Phase::Steady, signal).into_iter().collect())
                } else {
                    Outcome::Accepted(Vec::new())
                }
            }
        }
    }

    /// Moves forward to `to`. Backward or same-phase moves are refused.
    fn advance(&mut self, to: Phase, signal: Signal) -> Option<PhaseTransition> {
        if to <= self.phase {
            return None;
        }
        let from = self.phase;
        self.phase = to;
        Some(PhaseTransition { from, to, signal })
    }
}
