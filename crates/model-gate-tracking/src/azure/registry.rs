//! Azure ML model registry adapter
//!
//! Model versions live under `<workspace>/models/<name>/versions/<n>`. The
//! production model is the highest non-archived version tagged
//! `stage=production`; a new registration takes the next integer version.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model_gate_core::{
    ArtifactPath, ModelRef, ModelSpec, ModelType, Properties, RegisteredModel, RunId, Tags,
    PRODUCTION_LABEL, RUN_ID_PROPERTY, STAGE_TAG,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::credential::{TokenCredential, MANAGEMENT_SCOPE};
use super::{authorized_get, parse_arm_response};
use crate::error::TrackingResult;
use crate::store::ModelRegistry;

/// Property carrying a version's labels, comma separated
pub const LABELS_PROPERTY: &str = "model_gate.labels";

/// Model registry of one Azure ML workspace
pub struct AzureModelRegistry {
    http: reqwest::Client,
    workspace_url: Url,
    api_version: String,
    credential: Arc<dyn TokenCredential>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionList {
    #[serde(default)]
    value: Vec<VersionResource>,
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionResource {
    name: String,
    #[serde(default)]
    properties: VersionProperties,
    system_data: Option<SystemData>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, Option<String>>,
    #[serde(default)]
    properties: BTreeMap<String, Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_name: Option<String>,
    #[serde(default)]
    is_archived: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemData {
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct VersionRequest {
    properties: VersionProperties,
}

impl VersionResource {
    fn version(&self) -> Option<u32> {
        self.name.parse().ok()
    }

    fn tag(&self, key: &str) -> Option<&str> {
        self.properties.tags.get(key).and_then(|v| v.as_deref())
    }

    fn run_id(&self) -> Option<RunId> {
        self.properties
            .properties
            .get(RUN_ID_PROPERTY)
            .and_then(|v| v.as_deref())
            .or(self.properties.job_name.as_deref())
            .and_then(|id| RunId::new(id).ok())
    }

    fn is_production(&self) -> bool {
        !self.properties.is_archived && self.tag(STAGE_TAG) == Some(PRODUCTION_LABEL)
    }
}

fn flatten(map: &BTreeMap<String, Option<String>>) -> BTreeMap<String, String> {
    map.iter()
        .map(|(k, v)| (k.clone(), v.clone().unwrap_or_default()))
        .collect()
}

fn wrap(map: &BTreeMap<String, String>) -> BTreeMap<String, Option<String>> {
    map.iter().map(|(k, v)| (k.clone(), Some(v.clone()))).collect()
}

impl AzureModelRegistry {
    /// Create a registry client for the workspace at `workspace_url`
    pub fn new(
        workspace_url: Url,
        api_version: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            workspace_url,
            api_version: api_version.into(),
            credential,
        }
    }

    /// Use a preconfigured HTTP client
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn versions_url(&self, name: &str) -> TrackingResult<Url> {
        Ok(self.workspace_url.join(&format!("models/{}/versions", name))?)
    }

    fn version_url(&self, name: &str, version: u32) -> TrackingResult<Url> {
        Ok(self
            .workspace_url
            .join(&format!("models/{}/versions/{}", name, version))?)
    }

    /// List every version of `name`, following `nextLink` pages
    async fn list_versions(
        &self,
        name: &str,
        tag_filter: Option<&str>,
        token: &SecretString,
    ) -> TrackingResult<Vec<VersionResource>> {
        let mut query = vec![("api-version", self.api_version.as_str())];
        if let Some(filter) = tag_filter {
            query.push(("tags", filter));
        }

        let mut page: Option<VersionList> =
            authorized_get(&self.http, self.versions_url(name)?, token, &query).await?;
        let mut versions = Vec::new();

        while let Some(list) = page.take() {
            versions.extend(list.value);
            if let Some(next) = list.next_link {
                debug!(next_link = %next, "Following model version page");
                page = authorized_get(&self.http, Url::parse(&next)?, token, &[]).await?;
            }
        }
        Ok(versions)
    }
}

#[async_trait]
impl ModelRegistry for AzureModelRegistry {
    #[instrument(skip(self))]
    async fn get_production_model(&self, name: &str) -> TrackingResult<Option<ModelRef>> {
        let token = self.credential.get_token(MANAGEMENT_SCOPE).await?;
        let filter = format!("{}={}", STAGE_TAG, PRODUCTION_LABEL);
        let versions = self.list_versions(name, Some(&filter), &token).await?;

        let production = versions
            .iter()
            .filter(|v| v.is_production())
            .filter_map(|v| v.version().map(|n| (n, v)))
            .max_by_key(|(n, _)| *n);

        Ok(production.map(|(version, resource)| ModelRef {
            name: name.to_string(),
            version,
            run_id: resource.run_id(),
            path: resource
                .properties
                .model_uri
                .as_ref()
                .map(ArtifactPath::from_uri),
        }))
    }

    #[instrument(skip(self, spec), fields(model = %spec.name))]
    async fn upsert(&self, spec: ModelSpec) -> TrackingResult<RegisteredModel> {
        spec.validate()?;
        let token = self.credential.get_token(MANAGEMENT_SCOPE).await?;

        let existing = self.list_versions(&spec.name, None, &token).await?;
        let next = existing
            .iter()
            .filter_map(VersionResource::version)
            .max()
            .unwrap_or(0)
            + 1;

        let mut properties: Properties = spec.properties.clone();
        if !spec.labels.is_empty() {
            let labels: Vec<&str> = spec.labels.keys().map(String::as_str).collect();
            properties.insert(LABELS_PROPERTY.to_string(), labels.join(","));
        }

        let request = VersionRequest {
            properties: VersionProperties {
                description: spec.description.clone(),
                tags: wrap(&spec.tags),
                properties: wrap(&properties),
                model_type: Some(spec.model_type.as_str().to_string()),
                model_uri: Some(spec.path.as_str().to_string()),
                job_name: spec.run_id().map(|id| id.to_string()),
                is_archived: false,
            },
        };

        let url = self.version_url(&spec.name, next)?;
        info!(url = %url, version = next, "Registering model version");
        let response = self
            .http
            .put(url)
            .bearer_auth(token.expose_secret())
            .query(&[("api-version", self.api_version.as_str())])
            .json(&request)
            .send()
            .await?;
        let created: VersionResource = parse_arm_response(response).await?;

        let version = created.version().unwrap_or_else(|| {
            warn!(name = %created.name, "Registry returned a non-numeric version name");
            next
        });
        let tags: Tags = if created.properties.tags.is_empty() {
            spec.tags.clone()
        } else {
            flatten(&created.properties.tags)
        };
        let model_type = created
            .properties
            .model_type
            .as_deref()
            .and_then(|t| t.parse::<ModelType>().ok())
            .unwrap_or(spec.model_type);

        Ok(RegisteredModel {
            spec: ModelSpec {
                tags,
                model_type,
                ..spec
            },
            version,
            created_at: created.system_data.and_then(|d| d.created_at),
        })
    }
}

impl std::fmt::Debug for AzureModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureModelRegistry")
            .field("workspace_url", &self.workspace_url.as_str())
            .field("api_version", &self.api_version)
            .finish()
    }
}
