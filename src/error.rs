//! Error types for the compatibility engine and its surrounding tooling

use thiserror::Error;

use crate::version::BumpLevel;

/// Result type for schema-compat operations
pub type Result<T> = std::result::Result<T, CompatError>;

/// Errors raised outside the pure comparison path
#[derive(Error, Debug)]
pub enum CompatError {
    #[error("Schema source not found: {0}")]
    SourceNotFound(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Version bump too small: changes require {required}, proposed bump is {proposed}")]
    InsufficientBump {
        required: BumpLevel,
        proposed: BumpLevel,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),

    #[error("Invalid policy pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
