//! Azure Machine Learning adapters
//!
//! Workspace resolution, Azure AD credentials and the model registry are all
//! reached through Azure Resource Manager with bearer tokens.

pub mod credential;
pub mod registry;
pub mod workspace;

pub use credential::{
    credential_from_env, credential_from_lookup, ClientSecretCredential, StaticTokenCredential,
    TokenCredential, MANAGEMENT_SCOPE,
};
pub use registry::AzureModelRegistry;
pub use workspace::{
    AzureEndpoints, AzureWorkspace, WorkspaceClients, DEFAULT_AUTHORITY_HOST,
    DEFAULT_MANAGEMENT_ENDPOINT,
};

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

use crate::error::{TrackingError, TrackingResult};

/// Machine Learning Services api-version spoken by the adapters
pub const DEFAULT_API_VERSION: &str = "2023-10-01";

/// Error envelope returned by Resource Manager
#[derive(Debug, Deserialize)]
struct ArmErrorBody {
    error: Option<ArmErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ArmErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// GET a Resource Manager resource; `Ok(None)` on 404
pub(crate) async fn authorized_get<R: DeserializeOwned>(
    http: &reqwest::Client,
    url: Url,
    token: &SecretString,
    query: &[(&str, &str)],
) -> TrackingResult<Option<R>> {
    let response = http
        .get(url)
        .bearer_auth(token.expose_secret())
        .query(query)
        .send()
        .await?;
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    Ok(Some(parse_arm_response(response).await?))
}

/// Decode a successful response or map an ARM error body
pub(crate) async fn parse_arm_response<R: DeserializeOwned>(
    response: reqwest::Response,
) -> TrackingResult<R> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ArmErrorBody>(&text)
        .ok()
        .and_then(|body| body.error);
    let (code, message) = match detail {
        Some(detail) => (detail.code, detail.message.unwrap_or_else(|| text.clone())),
        None => (None, text),
    };

    Err(match status {
        StatusCode::NOT_FOUND => TrackingError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TrackingError::Authentication(message),
        _ => TrackingError::Remote {
            status: status.as_u16(),
            code,
            message,
        },
    })
}
