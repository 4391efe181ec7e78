//! Training Integration Tests
//!
//! Trains on a generated dataset, tracks the run locally or against a mocked
//! MLflow server, then feeds the run into the promotion gate.

mod common;

use common::fixtures::{write_insurance_csv, write_parameters};
use model_gate_core::{PromotionPolicy, RunStatus, TiePolicy, WorkspaceScope};
use model_gate_learn::{GradientBoostedClassifier, MODEL_FILE_NAME};
use model_gate_service::{
    DefaultPromotionService, DefaultTrainingService, PromoteRequest, PromotionService, TrainRequest,
    TrainingService, MODEL_HASH_TAG,
};
use model_gate_tracking::{InMemoryModelRegistry, LocalTrackingStore, MlflowClient};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scope() -> WorkspaceScope {
    WorkspaceScope::new("sub", "rg", "ws").unwrap()
}

#[tokio::test]
async fn test_train_then_promote_with_local_store() {
    let dir = tempfile::tempdir().unwrap();
    write_insurance_csv(dir.path(), 400, 3);
    let params = write_parameters(dir.path());
    let store = Arc::new(LocalTrackingStore::new(dir.path().join("mlruns")));
    let trainer = DefaultTrainingService::new(store.clone());

    let first = trainer
        .train(TrainRequest::new(dir.path(), &params, dir.path().join("model_output")))
        .await
        .unwrap();
    assert_eq!(first.test_rows, 80);
    assert_eq!(first.train_rows, 320);
    assert!(first.metric_value > 0.75, "auc was {}", first.metric_value);

    let record = store.load(&first.run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::Finished);
    assert_eq!(record.tags.get(MODEL_HASH_TAG), Some(&first.model_sha256));

    let model = GradientBoostedClassifier::load(dir.path().join("model_output")).unwrap();
    assert_eq!(model.feature_names().len(), 6);
    assert!(!model.feature_names().iter().any(|f| f == "id" || f == "target"));

    let registry = Arc::new(InMemoryModelRegistry::new());
    let gate = DefaultPromotionService::new(store.clone(), registry.clone());
    let promoted = gate
        .promote(PromoteRequest::new(first.run_id.clone(), scope()))
        .await
        .unwrap();
    assert_eq!(promoted.registered.unwrap().version, 1);

    // Same data, same seeds: the second run ties the first.
    let second = trainer
        .train(TrainRequest::new(dir.path(), &params, dir.path().join("model_output_2")))
        .await
        .unwrap();
    assert_eq!(second.metric_value, first.metric_value);
    assert_eq!(second.model_sha256, first.model_sha256);

    let strict = DefaultPromotionService::new(store.clone(), registry.clone())
        .with_policy(PromotionPolicy::new(TiePolicy::PreferIncumbent));
    let err = strict
        .promote(PromoteRequest::new(second.run_id.clone(), scope()))
        .await
        .unwrap_err();
    assert!(err.is_rejection());

    let promoted = gate
        .promote(PromoteRequest::new(second.run_id.clone(), scope()))
        .await
        .unwrap();
    assert_eq!(promoted.registered.unwrap().version, 2);
    assert_eq!(registry.versions(model_gate_core::DEFAULT_MODEL_NAME).await.len(), 2);
}

#[tokio::test]
async fn test_train_against_mlflow_server() {
    let dir = tempfile::tempdir().unwrap();
    write_insurance_csv(dir.path(), 200, 9);
    let params = write_parameters(dir.path());
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/create"))
        .and(body_partial_json(json!({"experiment_id": "12"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run": {"info": {"run_id": "abc123", "experiment_id": "12", "status": "RUNNING"}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/log-metric"))
        .and(body_partial_json(json!({"run_id": "abc123", "key": "auc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/set-tag"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/update"))
        .and(body_partial_json(json!({"run_id": "abc123", "status": "FINISHED"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"run_info": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = MlflowClient::new(&server.uri()).unwrap().with_experiment_id("12");
    let outcome = DefaultTrainingService::new(Arc::new(client))
        .train(TrainRequest::new(
            dir.path().join("insurance.csv"),
            &params,
            dir.path().join("out"),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.run_id.as_str(), "abc123");
    assert_eq!(outcome.model_path, dir.path().join("out").join(MODEL_FILE_NAME));
}

#[tokio::test]
async fn test_remote_failure_marks_run_failed() {
    let dir = tempfile::tempdir().unwrap();
    write_insurance_csv(dir.path(), 100, 5);
    let params = write_parameters(dir.path());
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run": {"info": {"run_id": "r-fail"}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/log-metric"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error_code": "INTERNAL_ERROR",
            "message": "backend unavailable"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/update"))
        .and(body_partial_json(json!({"run_id": "r-fail", "status": "FAILED"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = MlflowClient::new(&server.uri()).unwrap();
    let err = DefaultTrainingService::new(Arc::new(client))
        .train(TrainRequest::new(dir.path(), &params, dir.path().join("out")))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("backend unavailable"), "{err}");
    assert!(!dir.path().join("out").join(MODEL_FILE_NAME).exists());
}
