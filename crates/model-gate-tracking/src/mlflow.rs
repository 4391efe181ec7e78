//! MLflow REST tracking client
//!
//! Implements [`MetricStore`] and [`TrackingStore`] on top of the MLflow
//! 2.0 REST API. Managed workspaces expose the same API under an
//! `azureml://` tracking URI, which is rewritten to `https://`.

use async_trait::async_trait;
use chrono::Utc;
use model_gate_core::{RunId, RunStatus};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{TrackingError, TrackingResult};
use crate::store::{MetricStore, TrackingStore};

/// Experiment used when none is configured
pub const DEFAULT_EXPERIMENT_ID: &str = "0";

const API_PREFIX: &str = "api/2.0/mlflow/";

/// Convert a tracking URI into an HTTP base URL ending in `/`
pub fn normalize_tracking_uri(uri: &str) -> TrackingResult<Url> {
    let uri = uri.trim();
    let rewritten = match uri.strip_prefix("azureml://") {
        Some(rest) => format!("https://{}", rest),
        None => uri.to_string(),
    };

    let mut url = Url::parse(&rewritten)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(TrackingError::Configuration(format!(
            "Unsupported tracking URI scheme '{}': {}",
            url.scheme(),
            uri
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Client for an MLflow tracking server
#[derive(Clone)]
pub struct MlflowClient {
    http: reqwest::Client,
    base: Url,
    token: Option<SecretString>,
    experiment_id: String,
}

impl std::fmt::Debug for MlflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlflowClient")
            .field("base", &self.base.as_str())
            .field("authenticated", &self.token.is_some())
            .field("experiment_id", &self.experiment_id)
            .finish()
    }
}

impl MlflowClient {
    /// Create a client for the given tracking URI
    pub fn new(tracking_uri: &str) -> TrackingResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: normalize_tracking_uri(tracking_uri)?,
            token: None,
            experiment_id: DEFAULT_EXPERIMENT_ID.to_string(),
        })
    }

    /// Send a bearer token with every request
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Create new runs under this experiment
    pub fn with_experiment_id(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = experiment_id.into();
        self
    }

    /// Use a preconfigured HTTP client
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, method: &str) -> TrackingResult<Url> {
        Ok(self.base.join(API_PREFIX)?.join(method)?)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> TrackingResult<R> {
        let url = self.endpoint(method)?;
        debug!(url = %url, "POST mlflow");
        let response = self.authorize(self.http.post(url)).json(body).send().await?;
        parse_response(response).await
    }

    /// Fetch a run with its latest metrics and tags
    #[instrument(skip(self, run_id), fields(run_id = %run_id))]
    pub async fn get_run(&self, run_id: &RunId) -> TrackingResult<MlflowRun> {
        let url = self.endpoint("runs/get")?;
        let response = self
            .authorize(self.http.get(url))
            .query(&[("run_id", run_id.as_str())])
            .send()
            .await?;
        let body: GetRunResponse = parse_response(response).await?;
        Ok(body.run)
    }
}

async fn parse_response<R: DeserializeOwned>(response: reqwest::Response) -> TrackingResult<R> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let body: Option<MlflowErrorBody> = serde_json::from_str(&text).ok();
    let (code, message) = match body {
        Some(body) => (body.error_code, body.message.unwrap_or_else(|| text.clone())),
        None => (None, text),
    };
    Err(map_error(status, code, message))
}

fn map_error(status: StatusCode, code: Option<String>, message: String) -> TrackingError {
    if status == StatusCode::NOT_FOUND || code.as_deref() == Some("RESOURCE_DOES_NOT_EXIST") {
        return TrackingError::NotFound(message);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return TrackingError::Authentication(message);
    }
    TrackingError::Remote {
        status: status.as_u16(),
        code,
        message,
    }
}

/// Error body returned by MLflow
#[derive(Debug, Deserialize)]
struct MlflowErrorBody {
    error_code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetRunResponse {
    run: MlflowRun,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: MlflowRun,
}

/// Empty JSON object returned by write endpoints
#[derive(Debug, Deserialize)]
struct Empty {}

/// Run as returned by `runs/get`
#[derive(Debug, Clone, Deserialize)]
pub struct MlflowRun {
    /// Run metadata
    pub info: MlflowRunInfo,
    /// Logged metrics, params and tags
    #[serde(default)]
    pub data: MlflowRunData,
}

impl MlflowRun {
    /// Latest value of a metric
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.data
            .metrics
            .iter()
            .filter(|m| m.key == name)
            .max_by_key(|m| (m.step.unwrap_or(0), m.timestamp.unwrap_or(0)))
            .map(|m| m.value)
    }
}

/// Run metadata
#[derive(Debug, Clone, Deserialize)]
pub struct MlflowRunInfo {
    /// Run identifier
    pub run_id: String,
    /// Experiment the run belongs to
    #[serde(default)]
    pub experiment_id: Option<String>,
    /// Lifecycle status
    #[serde(default)]
    pub status: Option<String>,
}

/// Logged data of a run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MlflowRunData {
    /// Metric entries
    #[serde(default)]
    pub metrics: Vec<MlflowMetric>,
    /// Tag entries
    #[serde(default)]
    pub tags: Vec<MlflowTag>,
}

/// Single metric entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlflowMetric {
    pub key: String,
    pub value: f64,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub step: Option<i64>,
}

/// Single tag entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlflowTag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    experiment_id: &'a str,
    start_time: i64,
}

#[derive(Debug, Serialize)]
struct LogMetricRequest<'a> {
    run_id: &'a str,
    key: &'a str,
    value: f64,
    timestamp: i64,
    step: i64,
}

#[derive(Debug, Serialize)]
struct SetTagRequest<'a> {
    run_id: &'a str,
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateRunRequest<'a> {
    run_id: &'a str,
    status: &'a str,
    end_time: i64,
}

#[async_trait]
impl MetricStore for MlflowClient {
    async fn get_metric(&self, run_id: &RunId, name: &str) -> TrackingResult<Option<f64>> {
        let run = self.get_run(run_id).await?;
        Ok(run.metric(name))
    }
}

#[async_trait]
impl TrackingStore for MlflowClient {
    #[instrument(skip(self), fields(experiment_id = %self.experiment_id))]
    async fn start_run(&self) -> TrackingResult<RunId> {
        let request = CreateRunRequest {
            experiment_id: &self.experiment_id,
            start_time: Utc::now().timestamp_millis(),
        };
        let response: CreateRunResponse = self.post("runs/create", &request).await?;
        let run_id = RunId::new(response.run.info.run_id)?;
        info!(run_id = %run_id, "Started MLflow run");
        Ok(run_id)
    }

    async fn log_metric(&self, run_id: &RunId, name: &str, value: f64) -> TrackingResult<()> {
        let request = LogMetricRequest {
            run_id: run_id.as_str(),
            key: name,
            value,
            timestamp: Utc::now().timestamp_millis(),
            step: 0,
        };
        let _: Empty = self.post("runs/log-metric", &request).await?;
        Ok(())
    }

    async fn set_tag(&self, run_id: &RunId, key: &str, value: &str) -> TrackingResult<()> {
        let request = SetTagRequest {
            run_id: run_id.as_str(),
            key,
            value,
        };
        let _: Empty = self.post("runs/set-tag", &request).await?;
        Ok(())
    }

    async fn end_run(&self, run_id: &RunId, status: RunStatus) -> TrackingResult<()> {
        let request = UpdateRunRequest {
            run_id: run_id.as_str(),
            status: status.as_str(),
            end_time: Utc::now().timestamp_millis(),
        };
        let _: serde_json::Value = self.post("runs/update", &request).await?;
        Ok(())
    }
}
