//! CLI error types

use provcert_flake::FlakeError;
use provcert_summary::SummaryError;
use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Consolidation error
    #[error("{0}")]
    Summary(#[from] SummaryError),

    /// Flake corpus setup error
    #[error("Flake corpus error: {0}")]
    Flake(#[from] FlakeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
