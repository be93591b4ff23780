//! Configuration validation
//!
//! Semantic checks run on a deserialized [`FuseConfig`]. The validator
//! collects every issue instead of stopping at the first.

use std::time::Duration;

use crate::config::schema::FuseConfig;
use crate::error::{Severity, ValidationIssue};

/// Accepted frame rates.
pub const FPS_RANGE: std::ops::RangeInclusive<u32> = 1..=240;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Issues that prevent loading
    pub errors: Vec<ValidationIssue>,
    /// Informational issues
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `config`, returning every error and warning found.
    pub fn validate(&mut self, config: &FuseConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        let timing = &config.timing;
        for (path, value) in [
            ("timing.fall", timing.fall),
            ("timing.swing", timing.swing),
            ("timing.flicker_window", timing.flicker_window),
            ("timing.flicker_cycle", timing.flicker_cycle),
            ("timing.settle_transition", timing.settle_transition),
        ] {
            self.check_non_zero(path, value);
        }

        if timing.flicker_repeat == 0 {
            self.add_error("timing.flicker_repeat", "must be at least 1");
        }

        if !timing.flicker_cycle.is_zero() && timing.flicker_window < timing.flicker_cycle {
            self.add_warning(
                "timing.flicker_window",
                &format!(
                    "window ({}) is shorter than one flicker cycle ({})",
                    humantime::format_duration(timing.flicker_window),
                    humantime::format_duration(timing.flicker_cycle),
                ),
            );
        }

        if !FPS_RANGE.contains(&config.render.fps) {
            self.add_error(
                "render.fps",
                &format!(
                    "{} is outside {}..={}",
                    config.render.fps,
                    FPS_RANGE.start(),
                    FPS_RANGE.end()
                ),
            );
        }

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn check_non_zero(&mut self, path: &str, value: Duration) {
        if value.is_zero() {
            self.add_error(path, "duration must be greater than zero");
        }
    }

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(config: &FuseConfig) -> ValidationResult {
        Validator::new().validate(config)
    }

    #[test]
    fn test_defaults_are_valid() {
        let result = validate(&FuseConfig::default());
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = FuseConfig::default();
        config.timing.fall = Duration::ZERO;
        config.timing.swing = Duration::ZERO;
        config.timing.flicker_repeat = 0;
        config.render.fps = 0;

        let result = validate(&config);
        assert!(result.has_errors());
        let paths: Vec<&str> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "timing.fall",
                "timing.swing",
                "timing.flicker_repeat",
                "render.fps"
            ]
        );
    }

    #[test]
    fn test_fps_upper_bound() {
        let mut config = FuseConfig::default();
        config.render.fps = 240;
        assert!(validate(&config).is_valid());
        config.render.fps = 241;
        assert!(validate(&config).has_errors());
    }

    #[test]
    fn test_short_window_is_warning() {
        let mut config = FuseConfig::default();
        config.timing.flicker_window = Duration::from_millis(200);
        let result = validate(&config);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].severity, Severity::Warning);
        assert_eq!(result.warnings[0].path, "timing.flicker_window");
    }

    #[test]
    fn test_validator_is_reusable() {
        let mut validator = Validator::new();
        let mut bad = FuseConfig::default();
        bad.render.fps = 0;
        assert!(validator.validate(&bad).has_errors());
        assert!(validator.validate(&FuseConfig::default()).is_valid());
    }
}
