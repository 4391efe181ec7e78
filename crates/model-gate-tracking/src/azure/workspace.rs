//! Azure ML workspace resolution
//!
//! Resolving a workspace authenticates once, looks the workspace up through
//! Azure Resource Manager and hands back the two clients the promoter needs:
//! an MLflow client bound to the workspace's tracking endpoint and a model
//! registry client.

use model_gate_core::WorkspaceScope;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use url::Url;

use super::credential::{TokenCredential, MANAGEMENT_SCOPE};
use super::registry::AzureModelRegistry;
use super::{authorized_get, DEFAULT_API_VERSION};
use crate::error::{TrackingError, TrackingResult};
use crate::mlflow::MlflowClient;

/// Public cloud Resource Manager endpoint
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com/";

/// Public cloud Azure AD authority
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com/";

/// Cloud endpoints used to reach a workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzureEndpoints {
    /// Resource Manager base URL
    pub management: Url,
    /// Azure AD authority base URL
    pub authority_host: Url,
    /// Machine Learning Services api-version
    pub api_version: String,
}

impl AzureEndpoints {
    /// Public cloud endpoints
    pub fn public_cloud() -> TrackingResult<Self> {
        Self::new(DEFAULT_MANAGEMENT_ENDPOINT, DEFAULT_AUTHORITY_HOST)
    }

    /// Endpoints with custom base URLs
    pub fn new(management: &str, authority_host: &str) -> TrackingResult<Self> {
        Ok(Self {
            management: with_trailing_slash(Url::parse(management)?),
            authority_host: with_trailing_slash(Url::parse(authority_host)?),
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Override the api-version
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Resource Manager URL of a workspace, ending in `/`
    pub fn workspace_url(&self, scope: &WorkspaceScope) -> TrackingResult<Url> {
        Ok(self.management.join(&format!("{}/", scope.resource_path()))?)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[derive(Debug, Deserialize)]
struct WorkspaceResource {
    #[serde(default)]
    properties: WorkspaceProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceProperties {
    ml_flow_tracking_uri: Option<String>,
    discovery_url: Option<String>,
}

/// Clients bound to a resolved workspace
pub struct WorkspaceClients {
    /// Tracking endpoint reported by the workspace
    pub tracking_uri: String,
    /// MLflow client for run metrics
    pub tracking: Arc<MlflowClient>,
    /// Model registry client
    pub registry: Arc<AzureModelRegistry>,
}

/// Handle for connecting to an Azure ML workspace
pub struct AzureWorkspace {
    scope: WorkspaceScope,
    endpoints: AzureEndpoints,
    credential: Arc<dyn TokenCredential>,
    http: reqwest::Client,
}

impl AzureWorkspace {
    /// Create a handle; nothing is contacted until [`AzureWorkspace::connect`]
    pub fn new(
        scope: WorkspaceScope,
        endpoints: AzureEndpoints,
        credential: Arc<dyn TokenCredential>,
    ) -> Self {
        Self {
            scope,
            endpoints,
            credential,
            http: reqwest::Client::new(),
        }
    }

    /// Workspace coordinates
    pub fn scope(&self) -> &WorkspaceScope {
        &self.scope
    }

    /// Look the workspace up and return its MLflow tracking URI
    #[instrument(skip(self), fields(workspace = %self.scope))]
    pub async fn tracking_uri(&self) -> TrackingResult<String> {
        let token = self.credential.get_token(MANAGEMENT_SCOPE).await?;
        let mut url = self.endpoints.workspace_url(&self.scope)?;
        // The resource URL must not end in a slash for the GET.
        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);

        let resource: WorkspaceResource = authorized_get(
            &self.http,
            url,
            &token,
            &[("api-version", self.endpoints.api_version.as_str())],
        )
        .await?
        .ok_or_else(|| TrackingError::NotFound(format!("workspace {}", self.scope)))?;

        let properties = resource.properties;
        properties.ml_flow_tracking_uri.ok_or_else(|| {
            TrackingError::InvalidResponse(format!(
                "workspace {} has no MLflow tracking URI (discovery url: {})",
                self.scope,
                properties.discovery_url.as_deref().unwrap_or("none")
            ))
        })
    }

    /// Authenticate, resolve the workspace and build its clients
    pub async fn connect(self) -> TrackingResult<WorkspaceClients> {
        let tracking_uri = self.tracking_uri().await?;
        info!(tracking_uri = %tracking_uri, "Resolved workspace tracking endpoint");

        let token = self.credential.get_token(MANAGEMENT_SCOPE).await?;
        let tracking = MlflowClient::new(&tracking_uri)?
            .with_token(token)
            .with_http_client(self.http.clone());

        let registry = AzureModelRegistry::new(
            self.endpoints.workspace_url(&self.scope)?,
            self.endpoints.api_version.clone(),
            self.credential.clone(),
        )
        .with_http_client(self.http);

        Ok(WorkspaceClients {
            tracking_uri,
            tracking: Arc::new(tracking),
            registry: Arc::new(registry),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::credential::StaticTokenCredential;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WS_PATH: &str = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.MachineLearningServices/workspaces/ws";

    fn workspace(server: &MockServer) -> AzureWorkspace {
        AzureWorkspace::new(
            WorkspaceScope::new("sub", "rg", "ws").unwrap(),
            AzureEndpoints::new(&server.uri(), &server.uri()).unwrap(),
            Arc::new(StaticTokenCredential::new(SecretString::new("tok".to_string()))),
        )
    }

    #[test]
    fn test_workspace_url() {
        let endpoints = AzureEndpoints::public_cloud().unwrap();
        let scope = WorkspaceScope::new("sub", "rg", "ws").unwrap();
        assert_eq!(
            endpoints.workspace_url(&scope).unwrap().as_str(),
            format!("https://management.azure.com{}/", WS_PATH)
        );
    }

    #[tokio::test]
    async fn test_connect_resolves_tracking_uri() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WS_PATH))
            .and(query_param("api-version", DEFAULT_API_VERSION))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "ws",
                "properties": {
                    "mlFlowTrackingUri": "azureml://eastus.api.azureml.ms/mlflow/v1.0/subscriptions/sub/resourceGroups/rg/providers/Microsoft.MachineLearningServices/workspaces/ws"
                }
            })))
            .mount(&server)
            .await;

        let clients = workspace(&server).connect().await.unwrap();
        assert!(clients.tracking_uri.starts_with("azureml://eastus"));
        assert_eq!(clients.tracking.base_url().scheme(), "https");
    }

    #[tokio::test]
    async fn test_unknown_workspace_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WS_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "ResourceNotFound", "message": "missing" }
            })))
            .mount(&server)
            .await;

        let err = match workspace(&server).connect().await {
            Ok(_) => panic!("expected an error"),
            Err(err) => err,
        };
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_forbidden_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WS_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": "AuthorizationFailed", "message": "no access" }
            })))
            .mount(&server)
            .await;

        let err = workspace(&server).tracking_uri().await.unwrap_err();
        assert!(err.is_authentication());
        assert!(err.to_string().contains("no access"));
    }
}
