//! Gate configuration
//!
//! This module handles hierarchical configuration loading from multiple sources:
//! - Default configuration file
//! - Environment-specific configuration file
//! - Environment variables
//! - Command-line arguments (applied by the binaries)

use config::{Config, ConfigError, Environment, File};
use model_gate_core::TiePolicy;
use model_gate_tracking::azure::{
    AzureEndpoints, DEFAULT_API_VERSION, DEFAULT_AUTHORITY_HOST, DEFAULT_MANAGEMENT_ENDPOINT,
};
use model_gate_tracking::{TrackingResult, DEFAULT_EXPERIMENT_ID, DEFAULT_LOCAL_ROOT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix of environment variables read into the configuration
pub const ENV_PREFIX: &str = "MODEL_GATE";

/// Configuration shared by both binaries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tracking backend settings
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Azure endpoints
    #[serde(default)]
    pub azure: AzureConfig,

    /// Promotion gate settings
    #[serde(default)]
    pub promotion: PromotionConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON formatting
    #[serde(default)]
    pub json_format: bool,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub include_timestamps: bool,

    /// Include thread IDs
    #[serde(default)]
    pub include_thread_ids: bool,

    /// Include target module
    #[serde(default = "default_true")]
    pub include_target: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            include_timestamps: true,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

/// Tracking backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// MLflow tracking URI; unset or `file:` selects the local store
    #[serde(default)]
    pub uri: Option<String>,

    /// Experiment new runs are created in
    #[serde(default = "default_experiment_id")]
    pub experiment_id: String,

    /// Directory of the local store
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
}

fn default_experiment_id() -> String {
    DEFAULT_EXPERIMENT_ID.to_string()
}

fn default_local_root() -> PathBuf {
    PathBuf::from(DEFAULT_LOCAL_ROOT)
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            uri: None,
            experiment_id: default_experiment_id(),
            local_root: default_local_root(),
        }
    }
}

/// Azure endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Resource Manager base URL
    #[serde(default = "default_management_endpoint")]
    pub management_endpoint: String,

    /// Azure AD authority base URL
    #[serde(default = "default_authority_host")]
    pub authority_host: String,

    /// Machine Learning Services api-version
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_management_endpoint() -> String {
    DEFAULT_MANAGEMENT_ENDPOINT.to_string()
}

fn default_authority_host() -> String {
    DEFAULT_AUTHORITY_HOST.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            management_endpoint: default_management_endpoint(),
            authority_host: default_authority_host(),
            api_version: default_api_version(),
        }
    }
}

impl AzureConfig {
    /// Parsed endpoints
    pub fn endpoints(&self) -> TrackingResult<AzureEndpoints> {
        Ok(
            AzureEndpoints::new(&self.management_endpoint, &self.authority_host)?
                .with_api_version(self.api_version.clone()),
        )
    }
}

/// Promotion gate configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromotionConfig {
    /// Tie-breaking rule
    #[serde(default)]
    pub tie_policy: TiePolicy,

    /// Decide without registering
    #[serde(default)]
    pub dry_run: bool,
}

impl GateConfig {
    /// Load configuration from files and environment
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default configuration file (config/default.toml)
    /// 2. Environment-specific file (config/{env}.toml)
    /// 3. Environment variables (e.g. `MODEL_GATE_TRACKING__URI`)
    ///
    /// # Errors
    ///
    /// Returns an error if a present file or variable cannot be parsed
    pub fn load(config_dir: impl Into<PathBuf>, environment: &str) -> Result<Self, ConfigError> {
        let config_dir = config_dir.into();

        let config = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", environment))).required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GateConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.tracking.uri.is_none());
        assert_eq!(config.tracking.experiment_id, "0");
        assert_eq!(config.tracking.local_root, PathBuf::from("mlruns"));
        assert_eq!(config.promotion.tie_policy, TiePolicy::PreferNew);
        assert!(!config.promotion.dry_run);
    }

    #[test]
    fn test_missing_directory_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GateConfig::load(dir.path().join("absent"), "test").unwrap();
        assert_eq!(config.azure.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn test_environment_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[logging]\nlevel = \"debug\"\n\n[promotion]\ntie_policy = \"prefer-new\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.toml"),
            "[promotion]\ntie_policy = \"prefer-incumbent\"\ndry_run = true\n\n[tracking]\nuri = \"http://mlflow:5000\"\n",
        )
        .unwrap();

        let config = GateConfig::load(dir.path(), "staging").unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.promotion.tie_policy, TiePolicy::PreferIncumbent);
        assert!(config.promotion.dry_run);
        assert_eq!(config.tracking.uri.as_deref(), Some("http://mlflow:5000"));
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[promotion]\ndry_run = true\ntie_policy = \"prefer-incumbant\"\n",
        )
        .unwrap();

        let err = GateConfig::load(dir.path(), "development").unwrap_err();
        assert!(err.to_string().contains("prefer-incumbant"), "{err}");
    }

    #[test]
    fn test_azure_endpoints() {
        let endpoints = AzureConfig::default().endpoints().unwrap();
        assert_eq!(endpoints.management.as_str(), DEFAULT_MANAGEMENT_ENDPOINT);
        assert_eq!(endpoints.api_version, DEFAULT_API_VERSION);
    }
}
