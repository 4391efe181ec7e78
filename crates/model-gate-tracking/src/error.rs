//! Tracking-specific error types and conversions
//!
//! This module provides error types for talking to the tracking service and
//! the model registry: transport failures, remote error bodies, credential
//! problems and local file-store failures.

use thiserror::Error;

/// Result type alias for tracking operations
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Tracking and registry errors
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Run, model or workspace does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Credentials missing or rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Remote service answered with an error status
    #[error("Remote error ({status}{}): {message}", .code.as_deref().map(|c| format!(", {}", c)).unwrap_or_default())]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Bad endpoint, URI or missing setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Local file-store failure
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Domain error from core crate
    #[error("Domain error: {0}")]
    Domain(#[from] model_gate_core::CoreError),

    /// Internal adapter error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrackingError {
    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackingError::NotFound(_))
    }

    /// Check if this error is an authentication error
    pub fn is_authentication(&self) -> bool {
        matches!(self, TrackingError::Authentication(_))
    }
}

impl From<reqwest::Error> for TrackingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TrackingError::InvalidResponse(err.to_string())
        } else {
            TrackingError::Http(err.to_string())
        }
    }
}

impl From<url::ParseError> for TrackingError {
    fn from(err: url::ParseError) -> Self {
        TrackingError::Configuration(format!("Invalid URL: {}", err))
    }
}

impl From<std::io::Error> for TrackingError {
    fn from(err: std::io::Error) -> Self {
        TrackingError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrackingError {
    fn from(err: serde_json::Error) -> Self {
        TrackingError::Serialization(err.to_string())
    }
}
