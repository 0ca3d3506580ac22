//! Config error types
//!
//! The engine itself never fails at runtime; loading and validating a
//! `SimulationConfig` is the only fallible surface.

use thiserror::Error;

/// Errors that can occur while loading a simulation config.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config JSON could not be parsed.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the engine cannot run with.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid {
        /// Offending field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A palette entry is not a `#rrggbb` color.
    #[error("invalid color: {0}")]
    BadColor(String),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
