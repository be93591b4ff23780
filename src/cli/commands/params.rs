//! `params` command: inspect visual parameters

use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;

use crate::animation::SimulatedRuntime;
use crate::cli::args::{OutputFormat, ParamsArgs};
use crate::config::ConfigLoader;
use crate::error::FuseLightError;
use crate::render::{Frame, sample_frame};
use crate::scheduler::ManualScheduler;
use crate::sequencer::{AnimationSequencer, CycleTiming, SequencerState, VisualParams};

#[derive(Debug, Serialize)]
struct Report {
    state: SequencerState,
    params: VisualParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame: Option<Frame>,
}

/// Print the visual parameters for an explicit or simulated state.
///
/// # Errors
///
/// Returns a usage error if the flags describe an impossible state, or a
/// config error if `--config` fails to load.
pub fn run(args: &ParamsArgs) -> Result<(), FuseLightError> {
    let report = match args.at {
        Some(at) => simulate(args, Duration::from_millis(at))?,
        None => describe(args)?,
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Human => print_human(&report),
    }
    Ok(())
}

fn describe(args: &ParamsArgs) -> Result<Report, FuseLightError> {
    let state = args.phase.map_or_else(SequencerState::initial, |phase| SequencerState {
        phase,
        swing_complete: args.swing_complete,
        flicker_active: args.flicker_active,
    });
    if !state.is_consistent() {
        return Err(FuseLightError::Usage(format!(
            "phase {} with swing_complete={} and flicker_active={} is not a reachable state",
            state.phase, state.swing_complete, state.flicker_active
        )));
    }
    Ok(Report {
        state,
        params: VisualParams::derive(&state, &CycleTiming::default()),
        frame: None,
    })
}

fn simulate(args: &ParamsArgs, at: Duration) -> Result<Report, FuseLightError> {
    let config = ConfigLoader::from_env()
        .load_or_default(args.config.as_deref())?
        .config;
    let timelines = config.timing.timelines();

    let scheduler = Rc::new(ManualScheduler::new());
    let sequencer =
        AnimationSequencer::start(Rc::clone(&scheduler), config.timing.sequencer_options());
    let _runtime = SimulatedRuntime::start(Rc::clone(&scheduler), sequencer.handle(), &timelines);
    scheduler.advance(at);

    Ok(Report {
        state: sequencer.state(),
        params: sequencer.current_visual_params(),
        frame: Some(sample_frame(&sequencer, &timelines, 0)),
    })
}

fn print_human(report: &Report) {
    let params = &report.params;
    let list = |values: &[f32]| {
        values
            .iter()
            .map(|v| format!("{v}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("phase:            {}", report.state.phase);
    println!("swing complete:   {}", report.state.swing_complete);
    println!("flicker active:   {}", report.state.flicker_active);
    println!("opacity:          [{}]", list(&params.opacity_keyframes));
    println!(
        "color:            [{}]",
        params
            .color_keyframes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("brightness:       [{}]", list(&params.brightness_keyframes));
    println!("glow:             {}", params.glow_intensity);
    match &params.halo_keyframes {
        Some(halo) => println!("halo:             [{}]", list(halo)),
        None => println!("halo:             none"),
    }
    println!(
        "playback:         {}ms x{}",
        params.playback.duration_ms,
        params.playback.repeat + 1
    );
    println!("projectile:       {}", params.projectile_visible);
    println!("pendulum:         {}", params.pendulum_active);
    println!(
        "headline:         {}{}",
        params.headline.color,
        params
            .headline
            .text_shadow
            .map_or_else(String::new, |shadow| format!(" (shadow {shadow})"))
    );
    if let Some(frame) = &report.frame {
        println!("elapsed:          {}ms", frame.elapsed_ms);
        println!("pendulum angle:   {:.1}", frame.pendulum_angle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::Phase;

    fn args(phase: Option<Phase>, swing_complete: bool, flicker_active: bool) -> ParamsArgs {
        ParamsArgs {
            phase,
            swing_complete,
            flicker_active,
            at: None,
            config: None,
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn test_describe_defaults_to_initial_state() {
        let report = describe(&args(None, false, false)).unwrap();
        assert_eq!(report.state, SequencerState::initial());
        assert!(report.params.projectile_visible);
    }

    #[test]
    fn test_describe_rejects_unreachable_state() {
        let err = describe(&args(Some(Phase::Steady), false, true)).unwrap_err();
        assert!(matches!(err, FuseLightError::Usage(_)));
        assert_eq!(err.exit_code(), crate::error::ExitCode::USAGE_ERROR);
    }

    #[test]
    fn test_simulate_lands_in_flickering() {
        let a = args(None, false, false);
        // Default swing ends at 4700 ms, so 4000 ms is mid-swing.
        let report = simulate(&a, Duration::from_millis(4000)).unwrap();
        assert_eq!(report.state.phase, Phase::Swinging);
        assert!(report.state.flicker_active);
        assert!(report.frame.is_some());

        let settled = simulate(&a, Duration::from_millis(5000)).unwrap();
        assert_eq!(settled.state.phase, Phase::Steady);
    }
}
