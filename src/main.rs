//! `fuselight` - Time-driven phase sequencer for the fuse and lightbulb animation

use clap::Parser;

use fuselight::cli::args::Cli;
use fuselight::cli::commands;
use fuselight::error::ExitCode;
use fuselight::observability::{StopReason, init_logging};
use fuselight::player::Shutdown;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(cli.log_format, cli.verbose, cli.color);
    }

    let shutdown = Shutdown::new();

    // First signal stops playback gracefully; a second one exits at once.
    let signals = shutdown.clone();
    tokio::spawn(async move {
        let Ok(mut sigterm) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            tracing::warn!("failed to register SIGTERM handler");
            return;
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => signals.trigger(StopReason::Interrupted),
            _ = sigterm.recv() => signals.trigger(StopReason::Terminated),
        }

        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
            _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
        }
    });

    let result = commands::dispatch(cli, &shutdown).await;

    match result {
        Ok(()) => std::process::exit(match shutdown.reason() {
            Some(StopReason::Interrupted) => ExitCode::INTERRUPTED,
            Some(StopReason::Terminated) => ExitCode::TERMINATED,
            Some(StopReason::Deadline) | None => ExitCode::SUCCESS,
        }),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
