//! Local file-backed tracking store
//!
//! Used when the trainer runs outside a managed workspace and no tracking URI
//! is configured. Each run is one JSON document `<root>/<run_id>.json`.

use async_trait::async_trait;
use model_gate_core::{RunId, RunStatus};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{TrackingError, TrackingResult};
use crate::store::{generate_run_id, MetricStore, RunRecord, TrackingStore};

/// Default directory for local runs
pub const DEFAULT_LOCAL_ROOT: &str = "mlruns";

/// Tracking store writing one JSON file per run
#[derive(Debug, Clone)]
pub struct LocalTrackingStore {
    root: PathBuf,
}

impl LocalTrackingStore {
    /// Create a store rooted at `root` (created on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Build a store from a `file:` URI or a plain path
    pub fn from_uri(uri: &str) -> Self {
        let path = uri
            .strip_prefix("file://")
            .or_else(|| uri.strip_prefix("file:"))
            .unwrap_or(uri);
        Self::new(path)
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_path(&self, run_id: &RunId) -> PathBuf {
        self.root.join(format!("{}.json", run_id))
    }

    /// Read a run record
    pub async fn load(&self, run_id: &RunId) -> TrackingResult<RunRecord> {
        let path = self.run_path(run_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TrackingError::NotFound(format!("run {}", run_id)));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, record: &RunRecord) -> TrackingResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(self.run_path(&record.run_id), json).await?;
        Ok(())
    }

    async fn update(
        &self,
        run_id: &RunId,
        f: impl FnOnce(&mut RunRecord) + Send,
    ) -> TrackingResult<()> {
        let mut record = self.load(run_id).await?;
        f(&mut record);
        self.save(&record).await
    }
}

impl Default for LocalTrackingStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_ROOT)
    }
}

#[async_trait]
impl MetricStore for LocalTrackingStore {
    async fn get_metric(&self, run_id: &RunId, name: &str) -> TrackingResult<Option<f64>> {
        Ok(self.load(run_id).await?.metrics.get(name).copied())
    }
}

#[async_trait]
impl TrackingStore for LocalTrackingStore {
    async fn start_run(&self) -> TrackingResult<RunId> {
        let record = RunRecord::new(generate_run_id());
        self.save(&record).await?;
        info!(
            run_id = %record.run_id,
            root = %self.root.display(),
            "Started local tracking run"
        );
        Ok(record.run_id)
    }

    async fn log_metric(&self, run_id: &RunId, name: &str, value: f64) -> TrackingResult<()> {
        debug!(run_id = %run_id, metric = name, value, "Logging metric locally");
        let name = name.to_string();
        self.update(run_id, move |record| {
            record.metrics.insert(name, value);
        })
        .await
    }

    async fn set_tag(&self, run_id: &RunId, key: &str, value: &str) -> TrackingResult<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.update(run_id, move |record| {
            record.tags.insert(key, value);
        })
        .await
    }

    async fn end_run(&self, run_id: &RunId, status: RunStatus) -> TrackingResult<()> {
        self.update(run_id, move |record| record.finish(status)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_run_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTrackingStore::new(dir.path().join("runs"));

        let run_id = store.start_run().await.unwrap();
        store.log_metric(&run_id, "auc", 0.77).await.unwrap();
        store.set_tag(&run_id, "model.sha256", "abc").await.unwrap();
        store.end_run(&run_id, RunStatus::Finished).await.unwrap();

        let record = store.load(&run_id).await.unwrap();
        assert_eq!(record.status, RunStatus::Finished);
        assert_eq!(record.tags.get("model.sha256").map(String::as_str), Some("abc"));
        assert_eq!(store.get_metric(&run_id, "auc").await.unwrap(), Some(0.77));
        assert_eq!(store.get_metric(&run_id, "loss").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_run_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTrackingStore::new(dir.path());
        let err = store
            .get_metric(&RunId::new("nope").unwrap(), "auc")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_from_uri() {
        assert_eq!(LocalTrackingStore::from_uri("file:///tmp/runs").root(), Path::new("/tmp/runs"));
        assert_eq!(LocalTrackingStore::from_uri("file:runs").root(), Path::new("runs"));
        assert_eq!(LocalTrackingStore::from_uri("./runs").root(), Path::new("./runs"));
    }
}
