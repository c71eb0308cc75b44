//! Error types for result consolidation.

use provcert_types::{FilterStage, ModelError};
use thiserror::Error;

use crate::consolidated::SummaryState;

/// Errors raised while building or filtering a consolidated summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// The archive path could not be read.
    #[error("Unreadable archive '{path}': {reason}")]
    UnreadableArchive { path: String, reason: String },

    /// The archive is a packed file; only extracted directories are read.
    #[error("Unsupported archive '{0}': extract it to a directory first")]
    UnsupportedArchive(String),

    /// The archive lists no plugins.
    #[error("No plugins found in archive '{0}'")]
    NoPlugins(String),

    /// A plugin has no result tree in the archive.
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// A suite definition file could not be read.
    #[error("Unreadable suite file '{path}': {source}")]
    SuiteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A lifecycle step was invoked out of order or twice.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: SummaryState, to: SummaryState },

    /// A filter stage output was written twice.
    #[error("Filter stage '{stage}' already applied to plugin '{plugin}'")]
    FilterAlreadyApplied { plugin: String, stage: FilterStage },

    /// Artifacts are only written once, into a fresh directory.
    #[error("Artifact directory already exists: {0}")]
    ArtifactDirExists(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<ModelError> for SummaryError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::FilterAlreadyApplied { plugin, stage } => {
                Self::FilterAlreadyApplied { plugin, stage }
            }
        }
    }
}

/// Result type for consolidation operations.
pub type SummaryResult<T> = Result<T, SummaryError>;
