//! Tracking and registry layer for model-gate
//!
//! This crate provides the capability traits the services depend on and one
//! adapter per backing platform:
//! - [`MetricStore`] / [`TrackingStore`]: read and write run metrics
//! - [`ModelRegistry`]: production lookup and version registration
//! - MLflow REST client for tracking servers and managed workspaces
//! - Azure ML workspace resolution, credentials and model registry
//! - Local JSON file store and in-memory stores
//!
//! # Example
//!
//! ```rust,no_run
//! use model_gate_core::{RunId, WorkspaceScope};
//! use model_gate_tracking::azure::{credential_from_env, AzureEndpoints, AzureWorkspace};
//! use model_gate_tracking::MetricStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoints = AzureEndpoints::public_cloud()?;
//! let credential = credential_from_env(&endpoints.authority_host)?;
//! let scope = WorkspaceScope::new("sub", "rg", "ws")?;
//!
//! let clients = AzureWorkspace::new(scope, endpoints, credential).connect().await?;
//! let auc = clients.tracking.get_metric(&RunId::new("run-1")?, "auc").await?;
//! # Ok(())
//! # }
//! ```

// Re-export core domain types for convenience
pub use model_gate_core;

// Public modules
pub mod azure;
pub mod error;
pub mod local;
pub mod memory;
pub mod mlflow;
pub mod store;

// Re-exports for convenience
pub use error::{TrackingError, TrackingResult};
pub use local::{LocalTrackingStore, DEFAULT_LOCAL_ROOT};
pub use memory::{InMemoryModelRegistry, InMemoryTrackingStore};
pub use mlflow::{normalize_tracking_uri, MlflowClient, DEFAULT_EXPERIMENT_ID};
pub use store::{generate_run_id, MetricStore, ModelRegistry, RunRecord, TrackingStore};

/// Tracking layer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming the tracking server
pub const TRACKING_URI_ENV: &str = "MLFLOW_TRACKING_URI";
