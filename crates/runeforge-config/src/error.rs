//! Configuration errors.

use std::path::PathBuf;

use runeforge_core::error::DomainError;
use thiserror::Error;

/// Errors raised while loading or validating rules configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The YAML document could not be parsed.
    #[error("failed to parse rules config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed but breaks a constraint.
    #[error("invalid rules config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for DomainError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
