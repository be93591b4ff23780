//! Configuration
//!
//! Loads and validates the YAML file that tunes animation timing and
//! playback.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions, Overrides};
pub use schema::{DEFAULT_FPS, FuseConfig, RenderConfig, TimingConfig};
pub use validation::{ValidationResult, Validator};
