//! Structured event stream
//!
//! Discrete, typed events emitted while a sequence plays. Events are
//! serialized as newline-delimited JSON (JSONL) with a monotonically
//! increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sequencer::{Phase, PhaseTransition, Signal};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Why a sequence stopped before settling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The configured teardown deadline passed.
    Deadline,
    /// Interrupted by SIGINT.
    Interrupted,
    /// Terminated by SIGTERM.
    Terminated,
}

/// Totals reported when a sequence settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Frames handed to the renderer
    pub frames_rendered: u64,
    /// Phase transitions observed
    pub phase_transitions: u64,
    /// Wall time from start to settle in milliseconds
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a run.
///
/// Serialized with a `"type"` tag so consumers can dispatch on the kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The sequencer was activated.
    SequenceStarted {
        /// When the sequence started.
        timestamp: DateTime<Utc>,
        /// Flicker window length in milliseconds.
        flicker_window_ms: u64,
        /// Target frame rate.
        fps: u32,
    },

    /// A new phase was entered.
    PhaseEntered {
        /// When the transition was observed.
        timestamp: DateTime<Utc>,
        /// Phase entered.
        phase: Phase,
        /// Zero-based index of the phase.
        phase_index: usize,
        /// Phase left.
        from: Phase,
        /// Signal that caused the transition.
        reason: Signal,
        /// Milliseconds since the sequence started.
        elapsed_ms: u64,
    },

    /// The flicker window opened.
    FlickerStarted {
        /// When the window opened.
        timestamp: DateTime<Utc>,
        /// Milliseconds since the sequence started.
        elapsed_ms: u64,
    },

    /// The flicker window closed.
    FlickerEnded {
        /// When the window closed.
        timestamp: DateTime<Utc>,
        /// Whether the swing had already completed.
        swing_complete: bool,
        /// Milliseconds since the sequence started.
        elapsed_ms: u64,
    },

    /// The sequence reached `Steady`.
    SequenceSettled {
        /// When the final frame was rendered.
        timestamp: DateTime<Utc>,
        /// Run totals.
        summary: RunSummary,
    },

    /// The sequencer was torn down before settling.
    SequenceTornDown {
        /// When teardown happened.
        timestamp: DateTime<Utc>,
        /// Phase at teardown.
        phase: Phase,
        /// Why the run stopped.
        reason: StopReason,
        /// Whether a pending timer was cancelled.
        cancelled_timer: bool,
    },
}

impl Event {
    /// Builds a [`Event::PhaseEntered`] for an applied transition.
    #[must_use]
    pub fn phase_entered(transition: &PhaseTransition, elapsed_ms: u64) -> Self {
        Self::PhaseEntered {
            timestamp: Utc::now(),
            phase: transition.to,
            phase_index: transition.to.index(),
            from: transition.from,
            reason: transition.signal,
            elapsed_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Buffered JSONL event writer.
///
/// Each [`emit`](Self::emit) increments the sequence counter, writes one
/// line and flushes. Serialization and I/O failures are dropped.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}
