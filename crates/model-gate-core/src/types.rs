//! Core type definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Metric value assumed for the incumbent when no production model exists
pub const NO_INCUMBENT_METRIC: f64 = -1.0;

/// Model name used when none is given
pub const DEFAULT_MODEL_NAME: &str = "insurance_model";

/// Metric compared between runs when none is given
pub const DEFAULT_METRIC_NAME: &str = "auc";

/// Label marking the model version serving production traffic
pub const PRODUCTION_LABEL: &str = "production";

/// Tag key recording the deployment stage of a model version
pub const STAGE_TAG: &str = "stage";

/// Property linking a registered model version back to its training run
pub const RUN_ID_PROPERTY: &str = "mlflow.runId";

/// Identifier of a training run in the tracking service
///
/// Run ids are opaque; the only requirement is that they can be embedded in a
/// storage path, so blanks, whitespace and path separators are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Parse a run id, rejecting values that cannot appear in a path segment
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidRunId("run id cannot be empty".to_string()));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
            return Err(CoreError::InvalidRunId(format!(
                "'{}' contains whitespace or path separators",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Fresh id in the 32-hex-digit form used by MLflow
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RunId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunId::new(s)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle status of a tracking run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run is in progress
    Running,
    /// Run completed successfully
    Finished,
    /// Run ended with an error
    Failed,
}

impl RunStatus {
    /// Wire name used by the tracking service
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        }
    }

    /// Whether the run has ended
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RUNNING" => Ok(RunStatus::Running),
            "FINISHED" => Ok(RunStatus::Finished),
            "FAILED" | "KILLED" => Ok(RunStatus::Failed),
            _ => Err(CoreError::InvalidRunStatus(s.to_string())),
        }
    }
}

/// Key-value tags attached to a model version
pub type Tags = BTreeMap<String, String>;

/// Key-value labels attached to a model version (values are usually empty)
pub type Labels = BTreeMap<String, String>;

/// Free-form key-value properties of a model version
pub type Properties = BTreeMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_trims_input() {
        let id = RunId::new("  abc123  ").unwrap();
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn test_run_id_rejects_blank_and_separators() {
        assert!(RunId::new("").is_err());
        assert!(RunId::new("   ").is_err());
        assert!(RunId::new("a/b").is_err());
        assert!(RunId::new("a b").is_err());
    }

    #[test]
    fn test_generated_run_id_is_valid() {
        let id = RunId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert_eq!(RunId::new(id.as_str()).unwrap(), id);
    }

    #[test]
    fn test_run_status_parsing() {
        assert_eq!("finished".parse::<RunStatus>().unwrap(), RunStatus::Finished);
        assert_eq!("KILLED".parse::<RunStatus>().unwrap(), RunStatus::Failed);
        assert!("paused".parse::<RunStatus>().is_err());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }
}
