//! Error types for model-gate domain objects

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Main error type for domain validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Run identifier is empty or malformed
    #[error("Invalid run id: {0}")]
    InvalidRunId(String),

    /// Model name is empty or malformed
    #[error("Invalid model name: {0}")]
    InvalidModelName(String),

    /// Workspace scope has a blank component
    #[error("Invalid workspace scope: {0}")]
    InvalidScope(String),

    /// Unknown tie policy name
    #[error("Invalid tie policy: {0}")]
    InvalidTiePolicy(String),

    /// Unknown run status name
    #[error("Invalid run status: {0}")]
    InvalidRunStatus(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),
}
