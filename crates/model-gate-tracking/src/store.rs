//! Capability traits for tracking and registry access
//!
//! Each external collaborator is reached through a narrow trait so the
//! training and promotion services never see a concrete client. One adapter
//! exists per backing platform; the in-memory adapters back the tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model_gate_core::{ModelRef, ModelSpec, RegisteredModel, RunId, RunStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::TrackingResult;

/// Read access to metrics logged on runs
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Latest value of `name` on `run_id`
    ///
    /// # Returns
    /// * `Ok(Some(value))` - The metric was logged on the run
    /// * `Ok(None)` - The run exists but never logged this metric
    /// * `Err(TrackingError::NotFound)` - The run does not exist
    async fn get_metric(&self, run_id: &RunId, name: &str) -> TrackingResult<Option<f64>>;
}

/// Write access to runs, used by the trainer
#[async_trait]
pub trait TrackingStore: MetricStore {
    /// Open a new run and return its id
    async fn start_run(&self) -> TrackingResult<RunId>;

    /// Record a metric value on a run
    async fn log_metric(&self, run_id: &RunId, name: &str, value: f64) -> TrackingResult<()>;

    /// Attach a tag to a run
    async fn set_tag(&self, run_id: &RunId, key: &str, value: &str) -> TrackingResult<()>;

    /// Close a run with a terminal status
    async fn end_run(&self, run_id: &RunId, status: RunStatus) -> TrackingResult<()>;
}

/// Model registry access, used by the promoter
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Version of `name` currently labelled for production, if any
    async fn get_production_model(&self, name: &str) -> TrackingResult<Option<ModelRef>>;

    /// Register `spec` as a new version of its model
    ///
    /// The registry assigns the version number. Labels on the spec move to
    /// the new version; uniqueness of a label across versions is the
    /// registry's responsibility.
    async fn upsert(&self, spec: ModelSpec) -> TrackingResult<RegisteredModel>;
}

/// Snapshot of a run as kept by the local and in-memory stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run identifier
    pub run_id: RunId,

    /// Lifecycle status
    pub status: RunStatus,

    /// Latest value per metric name
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,

    /// Run tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// When the run was opened
    pub start_time: DateTime<Utc>,

    /// When the run was closed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl RunRecord {
    /// New running record
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            status: RunStatus::Running,
            metrics: BTreeMap::new(),
            tags: BTreeMap::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Close the record with a terminal status
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.end_time = Some(Utc::now());
    }
}

/// Generate a run id in the 32-hex-digit form used by MLflow
pub fn generate_run_id() -> RunId {
    RunId::generate()
}
