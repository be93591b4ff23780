//! `validate` command

use serde_json::json;
use tracing::info;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::ConfigLoader;
use crate::error::{ConfigError, FuseLightError, Severity, ValidationIssue};

/// Validate configuration files, reporting every issue found.
///
/// # Errors
///
/// Returns an I/O error if a file does not exist, or a config error if any
/// file fails validation (or has warnings under `--strict`).
pub fn run(args: &ValidateArgs) -> Result<(), FuseLightError> {
    let loader = ConfigLoader::from_env();

    for path in &args.files {
        if !path.exists() {
            return Err(FuseLightError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }
        info!(file = %path.display(), "validating configuration");

        let result = loader.load(path);
        let (errors, warnings): (Vec<ValidationIssue>, Vec<ValidationIssue>) = match &result {
            Ok(loaded) => (
                Vec::new(),
                loaded
                    .warnings
                    .iter()
                    .map(|w| ValidationIssue {
                        path: w.location.clone().unwrap_or_default(),
                        message: w.message.clone(),
                        severity: Severity::Warning,
                    })
                    .collect(),
            ),
            Err(ConfigError::ValidationError { errors, .. }) => (errors.clone(), Vec::new()),
            Err(_) => (Vec::new(), Vec::new()),
        };

        match args.format {
            OutputFormat::Human => {
                for issue in errors.iter().chain(&warnings) {
                    println!("{}: {issue}", path.display());
                }
                if result.is_ok() {
                    println!("{}: ok", path.display());
                }
            }
            OutputFormat::Json => {
                let issues: Vec<_> = errors
                    .iter()
                    .chain(&warnings)
                    .map(|i| {
                        json!({
                            "path": i.path,
                            "message": i.message,
                            "severity": match i.severity {
                                Severity::Error => "error",
                                Severity::Warning => "warning",
                            },
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    json!({
                        "file": path.display().to_string(),
                        "valid": result.is_ok(),
                        "issues": issues,
                    })
                );
            }
        }

        result?;
        if args.strict && !warnings.is_empty() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: warnings,
            }
            .into());
        }
        info!(file = %path.display(), "configuration valid");
    }

    Ok(())
}
