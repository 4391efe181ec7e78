//! Request and response types for the services

use model_gate_core::{
    ModelRef, PromotionDecision, RegisteredModel, RunId, WorkspaceScope, DEFAULT_METRIC_NAME,
    DEFAULT_MODEL_NAME,
};
use model_gate_learn::{HoldOut, DEFAULT_SPLIT_SEED, DEFAULT_TEST_SIZE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Request to train and log a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainRequest {
    /// CSV file, or directory holding `insurance.csv`
    pub data_path: PathBuf,
    /// JSON file with a `training` object
    pub parameters_path: PathBuf,
    /// Directory receiving the model file
    pub output_dir: PathBuf,
    /// Name the held-out AUC is logged under
    pub metric_name: String,
    /// Existing run to log into instead of starting one
    #[serde(default)]
    pub run_id: Option<RunId>,
    /// Held-out fraction
    pub test_size: f64,
    /// Split seed
    pub split_seed: u64,
}

impl TrainRequest {
    pub fn new(
        data_path: impl Into<PathBuf>,
        parameters_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_path: data_path.into(),
            parameters_path: parameters_path.into(),
            output_dir: output_dir.into(),
            metric_name: DEFAULT_METRIC_NAME.to_string(),
            run_id: None,
            test_size: DEFAULT_TEST_SIZE,
            split_seed: DEFAULT_SPLIT_SEED,
        }
    }

    pub fn with_metric_name(mut self, metric_name: impl Into<String>) -> Self {
        self.metric_name = metric_name.into();
        self
    }

    pub fn with_run_id(mut self, run_id: Option<RunId>) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn hold_out(&self) -> HoldOut {
        HoldOut {
            test_size: self.test_size,
            seed: self.split_seed,
        }
    }
}

/// Result of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub run_id: RunId,
    pub metric_name: String,
    /// Held-out ROC AUC
    pub metric_value: f64,
    pub model_path: PathBuf,
    pub model_sha256: String,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Whether the run was supplied by the caller and left open
    pub reused_run: bool,
}

/// Request to gate a run's model into production
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoteRequest {
    pub run_id: RunId,
    pub scope: WorkspaceScope,
    pub model_name: String,
    pub metric_name: String,
    /// Decide without registering
    #[serde(default)]
    pub dry_run: bool,
    /// Description stored on the registered version
    #[serde(default)]
    pub description: Option<String>,
}

impl PromoteRequest {
    pub fn new(run_id: RunId, scope: WorkspaceScope) -> Self {
        Self {
            run_id,
            scope,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            metric_name: DEFAULT_METRIC_NAME.to_string(),
            dry_run: false,
            description: None,
        }
    }

    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_metric_name(mut self, metric_name: impl Into<String>) -> Self {
        self.metric_name = metric_name.into();
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Metrics gathered for a promotion and the resulting decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionEvaluation {
    pub run_id: RunId,
    pub model_name: String,
    pub metric_name: String,
    /// Current production version, if any
    pub incumbent: Option<ModelRef>,
    pub decision: PromotionDecision,
}

/// Outcome of a passing promotion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promoted {
    pub evaluation: PromotionEvaluation,
    /// Version written to the registry; `None` on a dry run
    pub registered: Option<RegisteredModel>,
}

impl Promoted {
    pub fn is_dry_run(&self) -> bool {
        self.registered.is_none()
    }
}
