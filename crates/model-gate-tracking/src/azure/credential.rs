//! Azure AD credentials
//!
//! The chain mirrors the environment part of the usual Azure credential
//! lookup: a pre-issued access token wins, then a service principal's client
//! secret. Anything else is an authentication error.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::error::{TrackingError, TrackingResult};

/// Scope for Azure Resource Manager tokens
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Environment variable holding a pre-issued bearer token
pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";
/// Environment variable holding the tenant id
pub const TENANT_ID_ENV: &str = "AZURE_TENANT_ID";
/// Environment variable holding the service principal's client id
pub const CLIENT_ID_ENV: &str = "AZURE_CLIENT_ID";
/// Environment variable holding the service principal's secret
pub const CLIENT_SECRET_ENV: &str = "AZURE_CLIENT_SECRET";

/// Refresh tokens this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer tokens
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Bearer token valid for `scope`
    async fn get_token(&self, scope: &str) -> TrackingResult<SecretString>;
}

/// Credential returning a fixed token
#[derive(Clone)]
pub struct StaticTokenCredential {
    token: SecretString,
}

impl StaticTokenCredential {
    /// Wrap a token
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scope: &str) -> TrackingResult<SecretString> {
        Ok(self.token.clone())
    }
}

/// Service principal authenticating with a client secret
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority_host: Url,
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    scope: String,
    token: SecretString,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

impl ClientSecretCredential {
    /// Create a credential for a service principal
    pub fn new(
        authority_host: Url,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            authority_host,
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret,
            cached: Mutex::new(None),
        }
    }

    fn token_url(&self) -> TrackingResult<Url> {
        Ok(self
            .authority_host
            .join(&format!("{}/oauth2/v2.0/token", self.tenant_id))?)
    }

    async fn request_token(&self, scope: &str) -> TrackingResult<CachedToken> {
        let url = self.token_url()?;
        debug!(url = %url, client_id = %self.client_id, "Requesting Azure AD token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret().as_str()),
            ("scope", scope),
        ];
        let response = self.http.post(url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<TokenErrorBody>(&text)
                .ok()
                .and_then(|b| b.error_description.or(b.error))
                .unwrap_or(text);
            return Err(TrackingError::Authentication(format!(
                "token request failed with {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let body: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
        Ok(CachedToken {
            scope: scope.to_string(),
            token: SecretString::new(body.access_token),
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scope: &str) -> TrackingResult<SecretString> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.scope == scope && entry.expires_at > Instant::now() {
                return Ok(entry.token.clone());
            }
        }

        let fresh = self.request_token(scope).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

/// Build a credential from process environment variables
pub fn credential_from_env(authority_host: &Url) -> TrackingResult<Arc<dyn TokenCredential>> {
    credential_from_lookup(authority_host, |key| std::env::var(key).ok())
}

/// Build a credential from an arbitrary variable lookup
pub fn credential_from_lookup(
    authority_host: &Url,
    lookup: impl Fn(&str) -> Option<String>,
) -> TrackingResult<Arc<dyn TokenCredential>> {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty(ACCESS_TOKEN_ENV) {
        info!("Using access token from {}", ACCESS_TOKEN_ENV);
        return Ok(Arc::new(StaticTokenCredential::new(SecretString::new(token))));
    }

    match (
        non_empty(TENANT_ID_ENV),
        non_empty(CLIENT_ID_ENV),
        non_empty(CLIENT_SECRET_ENV),
    ) {
        (Some(tenant_id), Some(client_id), Some(secret)) => {
            info!(tenant_id = %tenant_id, client_id = %client_id, "Using client secret credential");
            Ok(Arc::new(ClientSecretCredential::new(
                authority_host.clone(),
                tenant_id,
                client_id,
                SecretString::new(secret),
            )))
        }
        _ => Err(TrackingError::Authentication(format!(
            "no credential available: set {} or {}, {} and {}",
            ACCESS_TOKEN_ENV, TENANT_ID_ENV, CLIENT_ID_ENV, CLIENT_SECRET_ENV
        ))),
    }
}
