//! `run` command: real-time playback

use std::time::Duration;

use tracing::info;

use crate::cli::args::{OutputFormat, RunArgs};
use crate::config::ConfigLoader;
use crate::config::validation::Validator;
use crate::error::{ConfigError, FuseLightError};
use crate::observability::EventEmitter;
use crate::player::{self, PlayEnd, Shutdown};
use crate::render::{JsonlRenderer, LogRenderer, Renderer, TextRenderer};

/// Play the sequence, rendering frames to stdout until it settles.
///
/// With `quiet`, frames go to the debug log instead of stdout.
///
/// # Errors
///
/// Returns a config error if the configuration is invalid, or an I/O error
/// if the events file or stdout cannot be written.
pub async fn run(args: &RunArgs, quiet: bool, shutdown: &Shutdown) -> Result<(), FuseLightError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        info!(port, "Prometheus metrics endpoint started");
    }

    if let Some(path) = &args.config {
        info!(config = %path.display(), "loading configuration");
    }
    let mut config = ConfigLoader::from_env()
        .load_or_default(args.config.as_deref())?
        .config;

    if let Some(fps) = args.fps {
        config.render.fps = fps;
    }
    if let Some(swing) = args.swing {
        config.timing.swing = Duration::from_millis(swing);
    }
    let result = Validator::new().validate(&config);
    if result.has_errors() {
        return Err(ConfigError::ValidationError {
            path: "<command line>".to_string(),
            errors: result.errors,
        }
        .into());
    }

    let emitter = match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };

    let mut renderer: Box<dyn Renderer> = match (quiet, args.format) {
        (true, _) => Box::new(LogRenderer::new()),
        (false, OutputFormat::Human) => Box::new(TextRenderer::new(std::io::stdout())),
        (false, OutputFormat::Json) => Box::new(JsonlRenderer::new(std::io::stdout())),
    };

    let report = player::play(
        &config,
        renderer.as_mut(),
        &emitter,
        shutdown,
        args.teardown_after.map(Duration::from_millis),
    )
    .await?;

    match report.end {
        PlayEnd::Settled => info!(
            frames = report.summary.frames_rendered,
            "sequence complete"
        ),
        PlayEnd::Stopped(reason) => info!(
            ?reason,
            phase = %report.final_phase,
            "sequence stopped before settling"
        ),
    }
    Ok(())
}
