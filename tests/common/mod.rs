//! Common test utilities and helpers
//!
//! A wiremock server stands in for both Azure Resource Manager and the
//! workspace's MLflow endpoint, so the promoter can be driven end to end.

use model_gate_core::WorkspaceScope;
use model_gate_tracking::azure::{AzureEndpoints, AzureWorkspace, StaticTokenCredential};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub mod fixtures;

pub const SUBSCRIPTION: &str = "sub-1";
pub const RESOURCE_GROUP: &str = "rg-ml";
pub const WORKSPACE: &str = "ws-insurance";
pub const TOKEN: &str = "test-token";

/// Mocked Azure ML workspace
pub struct MockWorkspace {
    pub server: MockServer,
}

impl MockWorkspace {
    /// Start a server that answers the workspace lookup
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let workspace = Self { server };

        Mock::given(method("GET"))
            .and(path(workspace.workspace_path()))
            .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": WORKSPACE,
                "properties": {
                    "mlFlowTrackingUri": workspace.tracking_uri(),
                    "discoveryUrl": format!("{}/discovery", workspace.server.uri()),
                }
            })))
            .mount(&workspace.server)
            .await;

        workspace
    }

    pub fn scope(&self) -> WorkspaceScope {
        WorkspaceScope::new(SUBSCRIPTION, RESOURCE_GROUP, WORKSPACE)
            .expect("Failed to build workspace scope")
    }

    /// Handle pointing every endpoint at the mock server
    pub fn workspace(&self) -> AzureWorkspace {
        AzureWorkspace::new(
            self.scope(),
            AzureEndpoints::new(&self.server.uri(), &self.server.uri())
                .expect("Failed to build endpoints"),
            Arc::new(StaticTokenCredential::new(SecretString::new(
                TOKEN.to_string(),
            ))),
        )
    }

    pub fn workspace_path(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
            SUBSCRIPTION, RESOURCE_GROUP, WORKSPACE
        )
    }

    pub fn versions_path(&self, model: &str) -> String {
        format!("{}/models/{}/versions", self.workspace_path(), model)
    }

    pub fn tracking_uri(&self) -> String {
        format!("{}/mlflow/v1.0", self.server.uri())
    }

    pub fn mlflow_path(&self, method: &str) -> String {
        format!("/mlflow/v1.0/api/2.0/mlflow/{}", method)
    }

    /// Answer `runs/get` for a run, with or without the metric
    pub async fn mount_run(&self, run_id: &str, metric: Option<(&str, f64)>) {
        let metrics: Vec<serde_json::Value> = metric
            .into_iter()
            .map(|(key, value)| json!({"key": key, "value": value, "timestamp": 1, "step": 0}))
            .collect();
        Mock::given(method("GET"))
            .and(path(self.mlflow_path("runs/get")))
            .and(query_param("run_id", run_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "run": {
                    "info": {"run_id": run_id, "experiment_id": "0", "status": "FINISHED"},
                    "data": {"metrics": metrics, "tags": []}
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Answer `runs/get` for a run that no longer exists
    pub async fn mount_missing_run(&self, run_id: &str) {
        Mock::given(method("GET"))
            .and(path(self.mlflow_path("runs/get")))
            .and(query_param("run_id", run_id))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error_code": "RESOURCE_DOES_NOT_EXIST",
                "message": format!("Run '{}' not found", run_id)
            })))
            .mount(&self.server)
            .await;
    }

    /// Answer the version listing of `model`; an empty list answers 404
    pub async fn mount_versions(&self, model: &str, versions: Vec<serde_json::Value>) {
        let response = if versions.is_empty() {
            ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": "UserError", "message": "Model container not found"}
            }))
        } else {
            ResponseTemplate::new(200).set_body_json(json!({ "value": versions }))
        };
        Mock::given(method("GET"))
            .and(path(self.versions_path(model)))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }
}
