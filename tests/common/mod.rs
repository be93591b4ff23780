//! Shared integration-test helpers for running the `fuselight` binary.

#![allow(dead_code)]

use std::io::Write;
use std::process::{Command, Output};

/// Runs the binary with `args`, logging disabled, and waits for it.
#[allow(clippy::missing_panics_doc)]
pub fn fuselight(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fuselight"))
        .args(args)
        .env_remove("FUSELIGHT_LOG_LEVEL")
        .env_remove("FUSELIGHT_FLICKER_WINDOW")
        .env_remove("FUSELIGHT_FPS")
        .env_remove("FUSELIGHT_CONFIG")
        .env_remove("FUSELIGHT_LOG_FORMAT")
        .env("FUSELIGHT_COLOR", "never")
        .output()
        .expect("failed to spawn fuselight")
}

/// Writes `contents` to a temporary YAML file.
#[allow(clippy::missing_panics_doc)]
pub fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp file");
    file
}

/// Parses each non-empty stdout line as JSON.
#[allow(clippy::missing_panics_doc)]
pub fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("stdout line is not JSON"))
        .collect()
}
