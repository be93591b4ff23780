//! Metrics collection
//!
//! Prometheus-compatible counters and gauges with typed recording helpers.
//! Labels are drawn from the closed [`Phase`] and [`Signal`] sets, so
//! cardinality is fixed.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::FuseLightError;
use crate::sequencer::{Phase, Signal};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs the global metrics recorder.
///
/// With `Some(port)` a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`; with `None` metrics are recorded in-process only.
/// Repeat calls are ignored.
///
/// # Errors
///
/// Returns [`FuseLightError::Metrics`] if the recorder or listener cannot
/// be installed (for example when the port is taken).
pub fn init_metrics(port: Option<u16>) -> Result<(), FuseLightError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| FuseLightError::Metrics(e.to_string()))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "fuselight_phase_transitions_total",
        "Total number of phase transitions by target phase"
    );
    describe_gauge!(
        "fuselight_current_phase",
        "Currently active phase (1 = active)"
    );
    describe_counter!(
        "fuselight_timers_cancelled_total",
        "Pending timers cancelled before firing"
    );
    describe_counter!(
        "fuselight_signals_ignored_total",
        "Signals whose precondition did not hold"
    );
    describe_counter!(
        "fuselight_frames_rendered_total",
        "Frames handed to a renderer"
    );
}

/// Records a transition into `to`.
pub fn record_phase_transition(to: Phase) {
    counter!("fuselight_phase_transitions_total", "to" => to.as_str()).increment(1);
}

/// Sets the current phase gauge, zeroing the previous phase's label.
pub fn set_current_phase(phase: Phase, previous: Option<Phase>) {
    if let Some(prev) = previous {
        gauge!("fuselight_current_phase", "phase" => prev.as_str()).set(0.0);
    }
    gauge!("fuselight_current_phase", "phase" => phase.as_str()).set(1.0);
}

/// Records a timer cancelled while still pending.
pub fn record_timer_cancelled() {
    counter!("fuselight_timers_cancelled_total").increment(1);
}

/// Records a signal that was ignored.
pub fn record_signal_ignored(signal: Signal) {
    counter!("fuselight_signals_ignored_total", "signal" => signal.as_str()).increment(1);
}

/// Records one rendered frame.
pub fn record_frame_rendered() {
    counter!("fuselight_frames_rendered_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic_without_recorder() {
        record_phase_transition(Phase::Impact);
        set_current_phase(Phase::Swinging, Some(Phase::Impact));
        set_current_phase(Phase::Falling, None);
        record_timer_cancelled();
        record_signal_ignored(Signal::SwingComplete);
        record_frame_rendered();
    }
}
