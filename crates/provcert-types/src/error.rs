//! Error types for the data model.

use thiserror::Error;

use crate::plugin::FilterStage;

/// Errors raised when a model invariant would be broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A filter-stage output was written twice.
    #[error("filter stage '{stage}' already applied to plugin '{plugin}'")]
    FilterAlreadyApplied {
        /// Plugin the output belongs to.
        plugin: String,
        /// Stage that was written twice.
        stage: FilterStage,
    },
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
