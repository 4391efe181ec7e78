//! Workspace scope and artifact location handling
//!
//! A training job writes its model into the workspace's default blob
//! datastore under a path derived from the run id. The promoter never sees the
//! file itself; it reconstructs that path from the workspace coordinates and
//! registers it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::types::RunId;

/// Datastore that training jobs write their outputs to
pub const DEFAULT_DATASTORE: &str = "workspaceblobstore";

/// Name of the job output holding the serialized model
pub const DEFAULT_OUTPUT_NAME: &str = "model_output";

/// Coordinates of a cloud ML workspace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceScope {
    /// Subscription the workspace is billed to
    pub subscription_id: String,
    /// Resource group containing the workspace
    pub resource_group: String,
    /// Workspace name
    pub workspace_name: String,
}

impl WorkspaceScope {
    /// Create a validated workspace scope
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        workspace_name: impl Into<String>,
    ) -> Result<Self> {
        let scope = Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            workspace_name: workspace_name.into(),
        };
        scope.validate()?;
        Ok(scope)
    }

    /// Validate that every component can be embedded in a resource path
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("subscription_id", &self.subscription_id),
            ("resource_group", &self.resource_group),
            ("workspace_name", &self.workspace_name),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::InvalidScope(format!("{} cannot be empty", field)));
            }
            if value.contains('/') {
                return Err(CoreError::InvalidScope(format!(
                    "{} cannot contain '/': {}",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// Resource manager path of the workspace, without a leading slash
    pub fn resource_path(&self) -> String {
        format!(
            "subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
            self.subscription_id, self.resource_group, self.workspace_name
        )
    }
}

impl fmt::Display for WorkspaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.subscription_id, self.resource_group, self.workspace_name
        )
    }
}

/// Datastore URI of a run's model output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactPath(String);

impl ArtifactPath {
    /// Path of the model written by `run_id` to the default datastore
    pub fn for_run(scope: &WorkspaceScope, run_id: &RunId) -> Self {
        Self::for_run_output(scope, run_id, DEFAULT_DATASTORE, DEFAULT_OUTPUT_NAME)
    }

    /// Path of a named output written by `run_id` to a specific datastore
    pub fn for_run_output(
        scope: &WorkspaceScope,
        run_id: &RunId,
        datastore: &str,
        output_name: &str,
    ) -> Self {
        Self(format!(
            "azureml://subscriptions/{}/resourcegroups/{}/workspaces/{}/datastores/{}/paths/azureml/{}/{}/",
            scope.subscription_id,
            scope.resource_group,
            scope.workspace_name,
            datastore,
            run_id,
            output_name
        ))
    }

    /// Wrap an already-formed URI
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Get the URI as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
