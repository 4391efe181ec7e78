//! Service-layer error types
//!
//! Lower-layer errors are wrapped so callers can still tell a rejected
//! promotion or a missing metric apart from infrastructure failures.

use model_gate_core::{CoreError, Rejection};
use model_gate_learn::LearnError;
use model_gate_tracking::TrackingError;
use thiserror::Error;

/// Result type alias for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Service-layer error types
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The run being evaluated has no value for the metric
    #[error("Metric '{metric}' not found on run {run_id}")]
    MissingMetric { run_id: String, metric: String },

    /// The candidate did not beat the production model
    #[error("Promotion rejected: {0}")]
    PromotionRejected(#[from] Rejection),

    /// Tracking service or registry failure
    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    /// Data loading, fitting or evaluation failure
    #[error("Training error: {0}")]
    Learn(#[from] LearnError),

    /// Invalid request
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Internal service error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Whether the promotion gate rejected the candidate
    pub fn is_rejection(&self) -> bool {
        matches!(self, ServiceError::PromotionRejected(_))
    }

    /// Whether the evaluated run lacked the metric
    pub fn is_missing_metric(&self) -> bool {
        matches!(self, ServiceError::MissingMetric { .. })
    }

    /// Whether a required resource or input file was not found
    pub fn is_not_found(&self) -> bool {
        match self {
            ServiceError::Tracking(err) => err.is_not_found(),
            ServiceError::Learn(err) => err.is_missing_file(),
            _ => false,
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(format!("Serialization error: {}", err))
    }
}
