//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check against [`ConfigLimits`]
//! 2. YAML parsing
//! 3. Deserialization to [`FuseConfig`]
//! 4. Environment overrides
//! 5. Validation

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::schema::FuseConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

/// Overrides the flicker window (humantime string).
pub const FLICKER_WINDOW_ENV: &str = "FUSELIGHT_FLICKER_WINDOW";
/// Overrides the frame rate.
pub const FPS_ENV: &str = "FUSELIGHT_FPS";
/// Caps the configuration file size in bytes.
pub const MAX_CONFIG_SIZE_ENV: &str = "FUSELIGHT_MAX_CONFIG_SIZE";

/// Options for the configuration loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Size limits
    pub limits: ConfigLimits,
    /// Values that replace whatever the file says
    pub overrides: Overrides,
}

impl LoaderOptions {
    /// Options with limits and overrides read from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            limits: ConfigLimits::from_env(),
            overrides: Overrides::from_env(),
        }
    }
}

/// Limits that guard against oversized input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes
    pub max_config_size: u64,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: 64 * 1024,
        }
    }
}

impl ConfigLimits {
    /// Limits with `FUSELIGHT_MAX_CONFIG_SIZE` applied.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_config_size: env_or(MAX_CONFIG_SIZE_ENV, defaults.max_config_size),
        }
    }
}

/// Values applied on top of the parsed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Replaces `timing.flicker_window`
    pub flicker_window: Option<Duration>,
    /// Replaces `render.fps`
    pub fps: Option<u32>,
}

impl Overrides {
    /// Reads overrides from the environment, ignoring unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            flicker_window: std::env::var(FLICKER_WINDOW_ENV)
                .ok()
                .and_then(|v| humantime::parse_duration(&v).ok()),
            fps: std::env::var(FPS_ENV).ok().and_then(|v| v.parse().ok()),
        }
    }

    fn apply(&self, config: &mut FuseConfig) {
        if let Some(window) = self.flicker_window {
            debug!(?window, "flicker window overridden");
            config.timing.flicker_window = window;
        }
        if let Some(fps) = self.fps {
            debug!(fps, "frame rate overridden");
            config.render.fps = fps;
        }
    }
}

/// Result of loading a configuration.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration
    pub config: FuseConfig,
    /// Warnings encountered during loading
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Warning message
    pub message: String,
    /// Field the warning refers to
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a loader configured from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(LoaderOptions::from_env())
    }

    /// Loads and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing or too large, fails
    /// to parse, or fails validation.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|e| read_error(path, &e))?;
        let limit = self.options.limits.max_config_size;
        if metadata.len() > limit {
            return Err(ConfigError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|e| read_error(path, &e))?;
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

        let config = if raw.trim().is_empty() {
            FuseConfig::default()
        } else {
            serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };

        self.finish(config, &path.display().to_string())
    }

    /// Loads `path` if given, otherwise the built-in defaults, with
    /// overrides and validation applied either way.
    ///
    /// # Errors
    ///
    /// As for [`load`](Self::load).
    pub fn load_or_default(&self, path: Option<&Path>) -> Result<LoadResult, ConfigError> {
        match path {
            Some(path) => self.load(path),
            None => self.finish(FuseConfig::default(), "<defaults>"),
        }
    }

    fn finish(&self, mut config: FuseConfig, origin: &str) -> Result<LoadResult, ConfigError> {
        self.options.overrides.apply(&mut config);

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.to_string(),
                errors: result.errors,
            });
        }

        let warnings = result
            .warnings
            .into_iter()
            .map(|issue| {
                warn!(path = %issue.path, "{}", issue.message);
                LoadWarning {
                    message: issue.message,
                    location: Some(issue.path),
                }
            })
            .collect();

        Ok(LoadResult { config, warnings })
    }
}

/// Maps a read failure: a missing file is reported as such, anything else
/// (unreadable, not UTF-8) as a parse failure.
fn read_error(path: &Path, err: &std::io::Error) -> ConfigError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ConfigError::MissingFile {
            path: path.to_path_buf(),
        }
    } else {
        ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: err.to_string(),
        }
    }
}

/// Parses an environment variable, falling back to `default`.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
