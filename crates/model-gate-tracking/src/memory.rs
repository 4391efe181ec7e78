//! In-memory tracking store and model registry
//!
//! Both stores keep everything behind a Tokio mutex and are meant for tests
//! and local dry runs.

use async_trait::async_trait;
use model_gate_core::{
    ModelRef, ModelSpec, RegisteredModel, RunId, RunStatus, PRODUCTION_LABEL,
};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{TrackingError, TrackingResult};
use crate::store::{generate_run_id, MetricStore, ModelRegistry, RunRecord, TrackingStore};

/// Tracking store holding runs in memory
#[derive(Debug, Default)]
pub struct InMemoryTrackingStore {
    runs: Mutex<HashMap<RunId, RunRecord>>,
}

impl InMemoryTrackingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a finished run carrying the given metrics
    pub async fn insert_run<'a>(
        &self,
        run_id: RunId,
        metrics: impl IntoIterator<Item = (&'a str, f64)>,
    ) {
        let mut record = RunRecord::new(run_id.clone());
        for (name, value) in metrics {
            record.metrics.insert(name.to_string(), value);
        }
        record.finish(RunStatus::Finished);
        self.runs.lock().await.insert(run_id, record);
    }

    /// Snapshot of a run
    pub async fn run(&self, run_id: &RunId) -> Option<RunRecord> {
        self.runs.lock().await.get(run_id).cloned()
    }

    /// Snapshot of every run
    pub async fn runs(&self) -> Vec<RunRecord> {
        self.runs.lock().await.values().cloned().collect()
    }

    /// Number of runs held
    pub async fn run_count(&self) -> usize {
        self.runs.lock().await.len()
    }

    async fn with_run<T>(
        &self,
        run_id: &RunId,
        f: impl FnOnce(&mut RunRecord) -> T,
    ) -> TrackingResult<T> {
        let mut runs = self.runs.lock().await;
        let record = runs
            .get_mut(run_id)
            .ok_or_else(|| TrackingError::NotFound(format!("run {}", run_id)))?;
        Ok(f(record))
    }
}

#[async_trait]
impl MetricStore for InMemoryTrackingStore {
    async fn get_metric(&self, run_id: &RunId, name: &str) -> TrackingResult<Option<f64>> {
        self.with_run(run_id, |record| record.metrics.get(name).copied())
            .await
    }
}

#[async_trait]
impl TrackingStore for InMemoryTrackingStore {
    async fn start_run(&self) -> TrackingResult<RunId> {
        let run_id = generate_run_id();
        self.runs
            .lock()
            .await
            .insert(run_id.clone(), RunRecord::new(run_id.clone()));
        debug!(run_id = %run_id, "Started in-memory run");
        Ok(run_id)
    }

    async fn log_metric(&self, run_id: &RunId, name: &str, value: f64) -> TrackingResult<()> {
        self.with_run(run_id, |record| {
            record.metrics.insert(name.to_string(), value);
        })
        .await
    }

    async fn set_tag(&self, run_id: &RunId, key: &str, value: &str) -> TrackingResult<()> {
        self.with_run(run_id, |record| {
            record.tags.insert(key.to_string(), value.to_string());
        })
        .await
    }

    async fn end_run(&self, run_id: &RunId, status: RunStatus) -> TrackingResult<()> {
        self.with_run(run_id, |record| record.finish(status)).await
    }
}

/// Model registry holding versions in memory
///
/// The production model is the highest version carrying the production
/// label, mirroring how a label moves forward on each promotion.
#[derive(Debug, Default)]
pub struct InMemoryModelRegistry {
    versions: Mutex<Vec<RegisteredModel>>,
}

impl InMemoryModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spec under an explicit version
    pub async fn insert(&self, spec: ModelSpec, version: u32) {
        self.versions
            .lock()
            .await
            .push(RegisteredModel::new(spec, version));
    }

    /// All versions of a model, oldest first
    pub async fn versions(&self, name: &str) -> Vec<RegisteredModel> {
        let mut versions: Vec<RegisteredModel> = self
            .versions
            .lock()
            .await
            .iter()
            .filter(|m| m.name() == name)
            .cloned()
            .collect();
        versions.sort_by_key(|m| m.version);
        versions
    }
}

#[async_trait]
impl ModelRegistry for InMemoryModelRegistry {
    async fn get_production_model(&self, name: &str) -> TrackingResult<Option<ModelRef>> {
        let versions = self.versions.lock().await;
        Ok(versions
            .iter()
            .filter(|m| m.name() == name && m.spec.has_label(PRODUCTION_LABEL))
            .max_by_key(|m| m.version)
            .map(RegisteredModel::to_ref))
    }

    async fn upsert(&self, spec: ModelSpec) -> TrackingResult<RegisteredModel> {
        spec.validate()?;
        let mut versions = self.versions.lock().await;
        let next = versions
            .iter()
            .filter(|m| m.name() == spec.name)
            .map(|m| m.version)
            .max()
            .unwrap_or(0)
            + 1;

        let registered = RegisteredModel::new(spec, next);
        versions.push(registered.clone());
        debug!(model = %registered.to_ref(), "Registered in-memory model version");
        Ok(registered)
    }
}
