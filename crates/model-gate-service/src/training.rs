//! Training service
//!
//! Loads the dataset and parameters, fits the classifier, logs the held-out
//! AUC to the tracking store and writes the model file. Inputs are read
//! before a run is opened so a bad path never leaves an empty run behind.

use async_trait::async_trait;
use model_gate_core::{RunId, RunStatus};
use model_gate_learn::{fit_and_evaluate, load_parameters, Dataset, TrainingParams};
use model_gate_tracking::TrackingStore;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::dto::{TrainOutcome, TrainRequest};
use crate::error::{ServiceError, ServiceResult};

/// Run tag holding the SHA-256 of the model file
pub const MODEL_HASH_TAG: &str = "model.sha256";

/// Run tag holding the model file location
pub const MODEL_PATH_TAG: &str = "model.path";

/// Trait for training operations
#[async_trait]
pub trait TrainingService: Send + Sync {
    /// Train, evaluate, log and save a model
    async fn train(&self, request: TrainRequest) -> ServiceResult<TrainOutcome>;
}

/// Default implementation of TrainingService
pub struct DefaultTrainingService {
    tracking: Arc<dyn TrackingStore>,
}

impl DefaultTrainingService {
    /// Create a new training service
    pub fn new(tracking: Arc<dyn TrackingStore>) -> Self {
        Self { tracking }
    }

    fn validate_request(request: &TrainRequest) -> ServiceResult<()> {
        if request.metric_name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "metric name cannot be empty".to_string(),
            ));
        }
        if !(request.test_size > 0.0 && request.test_size < 1.0) {
            return Err(ServiceError::Validation(format!(
                "test size must be in (0, 1), got {}",
                request.test_size
            )));
        }
        Ok(())
    }

    /// Everything that happens while the run is open
    async fn run_training(
        &self,
        run_id: &RunId,
        request: &TrainRequest,
        dataset: &Dataset,
        params: &TrainingParams,
    ) -> ServiceResult<TrainOutcome> {
        let evaluation = fit_and_evaluate(dataset, params, request.hold_out())?;
        info!(metric = %request.metric_name, value = evaluation.auc, "Logging metric");
        self.tracking
            .log_metric(run_id, &request.metric_name, evaluation.auc)
            .await?;

        let saved = evaluation.model.save(&request.output_dir)?;
        self.tracking
            .set_tag(run_id, MODEL_HASH_TAG, &saved.sha256)
            .await?;
        self.tracking
            .set_tag(run_id, MODEL_PATH_TAG, &saved.path.display().to_string())
            .await?;

        Ok(TrainOutcome {
            run_id: run_id.clone(),
            metric_name: request.metric_name.clone(),
            metric_value: evaluation.auc,
            model_path: saved.path,
            model_sha256: saved.sha256,
            train_rows: evaluation.train_rows,
            test_rows: evaluation.test_rows,
            reused_run: request.run_id.is_some(),
        })
    }
}

#[async_trait]
impl TrainingService for DefaultTrainingService {
    #[instrument(skip(self, request), fields(data = %request.data_path.display()))]
    async fn train(&self, request: TrainRequest) -> ServiceResult<TrainOutcome> {
        Self::validate_request(&request)?;

        let dataset = Dataset::from_csv_path(&request.data_path)?;
        let params = load_parameters(&request.parameters_path)?;

        let (run_id, owns_run) = match &request.run_id {
            Some(run_id) => {
                info!(run_id = %run_id, "Logging into existing run");
                (run_id.clone(), false)
            }
            None => {
                let run_id = self.tracking.start_run().await?;
                info!(run_id = %run_id, "Started tracking run");
                (run_id, true)
            }
        };

        match self.run_training(&run_id, &request, &dataset, &params).await {
            Ok(outcome) => {
                if owns_run {
                    self.tracking.end_run(&run_id, RunStatus::Finished).await?;
                }
                info!(
                    run_id = %run_id,
                    auc = outcome.metric_value,
                    model = %outcome.model_path.display(),
                    "Training complete"
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(run_id = %run_id, error = %err, "Training failed");
                if owns_run {
                    if let Err(end_err) = self.tracking.end_run(&run_id, RunStatus::Failed).await {
                        warn!(run_id = %run_id, error = %end_err, "Failed to mark run as failed");
                    }
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_gate_learn::MODEL_FILE_NAME;
    use model_gate_tracking::InMemoryTrackingStore;
    use std::fmt::Write as _;
    use std::path::Path;

    fn write_dataset(dir: &Path, rows: usize) {
        let mut csv = String::from("id,age,bmi,children,smoker,target\n");
        for i in 0..rows {
            let age = 18 + (i * 7) % 47;
            let bmi = 18.0 + ((i * 13) % 200) as f64 / 10.0;
            let smoker = i % 3 == 0;
            let target = u8::from(smoker && age > 30 || bmi > 34.0);
            writeln!(
                csv,
                "{},{},{:.1},{},{},{}",
                i,
                age,
                bmi,
                i % 4,
                smoker,
                target
            )
            .unwrap();
        }
        std::fs::write(dir.join("insurance.csv"), csv).unwrap();
    }

    fn write_params(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("params.json");
        std::fs::write(
            &path,
            r#"{"training": {"n_estimators": 40, "learning_rate": 0.2, "num_leaves": 8, "min_child_samples": 5, "objective": "binary"}}"#,
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_train_logs_metric_and_saves_model() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), 300);
        let params = write_params(dir.path());
        let output = dir.path().join("out");

        let tracking = Arc::new(InMemoryTrackingStore::new());
        let service = DefaultTrainingService::new(tracking.clone());

        let outcome = service
            .train(TrainRequest::new(dir.path(), &params, &output))
            .await
            .unwrap();

        assert!(outcome.metric_value > 0.9, "auc was {}", outcome.metric_value);
        assert_eq!(outcome.test_rows, 60);
        assert_eq!(outcome.model_path, output.join(MODEL_FILE_NAME));
        assert!(outcome.model_path.exists());
        assert!(!outcome.reused_run);

        let run = tracking.run(&outcome.run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Finished);
        assert_eq!(run.metrics.get("auc"), Some(&outcome.metric_value));
        assert_eq!(run.tags.get(MODEL_HASH_TAG), Some(&outcome.model_sha256));
    }

    #[tokio::test]
    async fn test_missing_data_fails_before_run_starts() {
        let dir = tempfile::tempdir().unwrap();
        let params = write_params(dir.path());
        let tracking = Arc::new(InMemoryTrackingStore::new());
        let service = DefaultTrainingService::new(tracking.clone());

        let err = service
            .train(TrainRequest::new(dir.path().join("nope.csv"), &params, dir.path()))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(tracking.run_count().await, 0);
    }

    #[tokio::test]
    async fn test_failure_after_start_marks_run_failed() {
        let dir = tempfile::tempdir().unwrap();
        // Every row positive: the held-out AUC is undefined.
        std::fs::write(
            dir.path().join("insurance.csv"),
            (0..20).fold(String::from("id,x,target\n"), |mut s, i| {
                let _ = writeln!(s, "{},{},1", i, i);
                s
            }),
        )
        .unwrap();
        let params = write_params(dir.path());
        let tracking = Arc::new(InMemoryTrackingStore::new());
        let service = DefaultTrainingService::new(tracking.clone());

        let err = service
            .train(TrainRequest::new(dir.path(), &params, dir.path().join("out")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Learn(_)));
        let runs = tracking.runs().await;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert!(runs[0].metrics.is_empty());
    }

    #[tokio::test]
    async fn test_reused_run_is_left_open() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), 120);
        let params = write_params(dir.path());

        let tracking = Arc::new(InMemoryTrackingStore::new());
        let run_id = tracking.start_run().await.unwrap();
        let service = DefaultTrainingService::new(tracking.clone());

        let outcome = service
            .train(
                TrainRequest::new(dir.path(), &params, dir.path().join("out"))
                    .with_metric_name("holdout_auc")
                    .with_run_id(Some(run_id.clone())),
            )
            .await
            .unwrap();

        assert!(outcome.reused_run);
        assert_eq!(outcome.run_id, run_id);
        let run = tracking.run(&run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.metrics.contains_key("holdout_auc"));
    }

    #[tokio::test]
    async fn test_empty_metric_name_rejected() {
        let service = DefaultTrainingService::new(Arc::new(InMemoryTrackingStore::new()));
        let err = service
            .train(TrainRequest::new("a", "b", "c").with_metric_name(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
