//! Training parameters
//!
//! Parameters come from a JSON document with a nested `training` object.
//! Names follow LightGBM's scikit-learn interface; the native aliases are
//! accepted too. Keys the booster does not use are kept in
//! [`TrainingParams::extra`] and reported, never rejected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{LearnError, LearnResult};

/// Keys that configure LightGBM itself and have no effect here
const PASSTHROUGH_KEYS: &[&str] = &[
    "objective",
    "boosting_type",
    "boosting",
    "metric",
    "verbose",
    "verbosity",
    "n_jobs",
    "num_threads",
    "class_weight",
    "importance_type",
];

/// Hyperparameters of the boosted classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Number of boosting rounds
    #[serde(
        default = "default_n_estimators",
        alias = "num_iterations",
        alias = "num_boost_round",
        alias = "n_iter"
    )]
    pub n_estimators: usize,

    /// Shrinkage applied to each tree
    #[serde(default = "default_learning_rate", alias = "eta", alias = "shrinkage_rate")]
    pub learning_rate: f64,

    /// Maximum leaves per tree
    #[serde(default = "default_num_leaves", alias = "num_leaf", alias = "max_leaves")]
    pub num_leaves: usize,

    /// Maximum depth; zero or negative means unlimited
    #[serde(default = "default_max_depth")]
    pub max_depth: i32,

    /// Minimum rows in a leaf
    #[serde(
        default = "default_min_child_samples",
        alias = "min_data_in_leaf",
        alias = "min_data_per_leaf"
    )]
    pub min_child_samples: usize,

    /// Minimum hessian sum in a leaf
    #[serde(default = "default_min_child_weight", alias = "min_sum_hessian_in_leaf")]
    pub min_child_weight: f64,

    /// Minimum gain to make a split
    #[serde(default, alias = "min_gain_to_split")]
    pub min_split_gain: f64,

    /// L2 regularization on leaf values
    #[serde(default, alias = "lambda_l2", alias = "lambda")]
    pub reg_lambda: f64,

    /// L1 regularization on leaf values
    #[serde(default, alias = "lambda_l1", alias = "alpha")]
    pub reg_alpha: f64,

    /// Row fraction sampled per tree
    #[serde(default = "default_fraction", alias = "bagging_fraction")]
    pub subsample: f64,

    /// Column fraction sampled per tree
    #[serde(default = "default_fraction", alias = "feature_fraction")]
    pub colsample_bytree: f64,

    /// Seed for subsampling
    #[serde(default, alias = "seed")]
    pub random_state: Option<u64>,

    /// Keys not used by the booster
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_n_estimators() -> usize {
    100
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_num_leaves() -> usize {
    31
}

fn default_max_depth() -> i32 {
    -1
}

fn default_min_child_samples() -> usize {
    20
}

fn default_min_child_weight() -> f64 {
    1e-3
}

fn default_fraction() -> f64 {
    1.0
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            learning_rate: default_learning_rate(),
            num_leaves: default_num_leaves(),
            max_depth: default_max_depth(),
            min_child_samples: default_min_child_samples(),
            min_child_weight: default_min_child_weight(),
            min_split_gain: 0.0,
            reg_lambda: 0.0,
            reg_alpha: 0.0,
            subsample: default_fraction(),
            colsample_bytree: default_fraction(),
            random_state: None,
            extra: BTreeMap::new(),
        }
    }
}

impl TrainingParams {
    /// Depth limit, `None` when unlimited
    pub fn depth_limit(&self) -> Option<usize> {
        (self.max_depth > 0).then_some(self.max_depth as usize)
    }

    /// Check value ranges
    pub fn validate(&self) -> LearnResult<()> {
        let invalid = |msg: String| Err(LearnError::InvalidParameters(msg));

        if self.n_estimators == 0 {
            return invalid("n_estimators must be at least 1".to_string());
        }
        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            return invalid(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if self.num_leaves < 2 {
            return invalid(format!("num_leaves must be at least 2, got {}", self.num_leaves));
        }
        if self.min_child_samples == 0 {
            return invalid("min_child_samples must be at least 1".to_string());
        }
        for (name, value) in [
            ("min_child_weight", self.min_child_weight),
            ("min_split_gain", self.min_split_gain),
            ("reg_lambda", self.reg_lambda),
            ("reg_alpha", self.reg_alpha),
        ] {
            if !(value >= 0.0) || !value.is_finite() {
                return invalid(format!("{} must be non-negative, got {}", name, value));
            }
        }
        for (name, value) in [
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return invalid(format!("{} must be in (0, 1], got {}", name, value));
            }
        }
        Ok(())
    }

    /// Log keys the booster ignores
    pub fn report_unused(&self) {
        for (key, value) in &self.extra {
            if PASSTHROUGH_KEYS.contains(&key.as_str()) {
                debug!(key = %key, value = %value, "Ignoring LightGBM runtime parameter");
            } else {
                warn!(key = %key, value = %value, "Unknown training parameter; ignored");
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ParametersDocument {
    training: Option<TrainingParams>,
}

/// Parse the `training` object of a parameters document
pub fn parse_parameters(json: &str) -> LearnResult<TrainingParams> {
    let document: ParametersDocument = serde_json::from_str(json)
        .map_err(|e| LearnError::InvalidParameters(e.to_string()))?;
    let params = document.training.ok_or_else(|| {
        LearnError::InvalidParameters("missing 'training' object".to_string())
    })?;
    params.validate()?;
    params.report_unused();
    Ok(params)
}

/// Read and parse a parameters file
pub fn load_parameters(path: impl AsRef<Path>) -> LearnResult<TrainingParams> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| LearnError::io(path, e))?;
    let params = parse_parameters(&content)?;
    info!(
        path = %path.display(),
        n_estimators = params.n_estimators,
        learning_rate = params.learning_rate,
        num_leaves = params.num_leaves,
        "Loaded training parameters"
    );
    Ok(params)
}
