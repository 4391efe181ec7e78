//! Gradient-boosted tree classifier
//!
//! Binary logistic boosting: the raw score starts at the log-odds of the
//! positive rate and each round adds a leaf-wise tree fitted to the gradient
//! and hessian of the logistic loss. Rows and columns may be subsampled per
//! round with a seeded generator, so training is reproducible.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::dataset::Dataset;
use crate::error::{LearnError, LearnResult};
use crate::metrics::log_loss;
use crate::params::TrainingParams;
use crate::split::DEFAULT_SPLIT_SEED;
use crate::tree::{grow_tree, GradientView, GrowthConfig, Tree};

/// File name of the serialized model inside the output directory
pub const MODEL_FILE_NAME: &str = "insurance_model.pkl";

/// Serialization format version written with each model
pub const MODEL_FORMAT_VERSION: u32 = 1;

const MIN_HESSIAN: f64 = 1e-16;
const MIN_PROBABILITY: f64 = 1e-6;

/// Fitted binary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    format_version: u32,
    feature_names: Vec<String>,
    init_score: f64,
    trees: Vec<Tree>,
    params: TrainingParams,
}

/// Location and digest of a written model file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedModel {
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of the file contents
    pub sha256: String,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl GradientBoostedClassifier {
    /// Fit on a training partition
    #[instrument(skip(dataset, params), fields(rows = dataset.n_rows(), features = dataset.n_features()))]
    pub fn fit(dataset: &Dataset, params: &TrainingParams) -> LearnResult<Self> {
        params.validate()?;
        let n_rows = dataset.n_rows();
        let n_features = dataset.n_features();
        if n_rows == 0 || n_features == 0 {
            return Err(LearnError::EmptyDataset(format!(
                "cannot fit on {} rows and {} features",
                n_rows, n_features
            )));
        }

        let targets = dataset.targets();
        let rate = dataset
            .positive_rate()
            .clamp(MIN_PROBABILITY, 1.0 - MIN_PROBABILITY);
        let init_score = (rate / (1.0 - rate)).ln();

        let config = GrowthConfig {
            num_leaves: params.num_leaves,
            max_depth: params.depth_limit(),
            min_child_samples: params.min_child_samples,
            min_child_weight: params.min_child_weight,
            min_split_gain: params.min_split_gain,
            reg_lambda: params.reg_lambda,
            reg_alpha: params.reg_alpha,
        };
        let row_sample = ((n_rows as f64 * params.subsample).round() as usize).clamp(1, n_rows);
        let column_sample =
            ((n_features as f64 * params.colsample_bytree).ceil() as usize).clamp(1, n_features);
        let mut rng = StdRng::seed_from_u64(params.random_state.unwrap_or(DEFAULT_SPLIT_SEED));

        let mut scores = vec![init_score; n_rows];
        let mut gradients = vec![0.0; n_rows];
        let mut hessians = vec![0.0; n_rows];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for round in 0..params.n_estimators {
            for i in 0..n_rows {
                let p = sigmoid(scores[i]);
                gradients[i] = p - targets[i];
                hessians[i] = (p * (1.0 - p)).max(MIN_HESSIAN);
            }

            let sample = if row_sample < n_rows {
                let mut rows = index::sample(&mut rng, n_rows, row_sample).into_vec();
                rows.sort_unstable();
                rows
            } else {
                (0..n_rows).collect()
            };
            let features = if column_sample < n_features {
                let mut columns = index::sample(&mut rng, n_features, column_sample).into_vec();
                columns.sort_unstable();
                columns
            } else {
                (0..n_features).collect()
            };

            let view = GradientView {
                rows: dataset.rows(),
                gradients: &gradients,
                hessians: &hessians,
            };
            let mut tree = grow_tree(&view, &sample, &features, &config);
            tree.scale(params.learning_rate);

            for (i, score) in scores.iter_mut().enumerate() {
                *score += tree.predict(dataset.row(i));
            }
            trees.push(tree);

            if (round + 1) % 10 == 0 || round + 1 == params.n_estimators {
                let probabilities: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
                debug!(
                    round = round + 1,
                    train_logloss = log_loss(targets, &probabilities),
                    "Boosting progress"
                );
            }
        }

        info!(
            trees = trees.len(),
            init_score = init_score,
            "Classifier fitted"
        );
        Ok(Self {
            format_version: MODEL_FORMAT_VERSION,
            feature_names: dataset.feature_names().to_vec(),
            init_score,
            trees,
            params: params.clone(),
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn init_score(&self) -> f64 {
        self.init_score
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Raw log-odds for one row
    pub fn predict_raw(&self, row: &[f64]) -> f64 {
        self.init_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    /// Probability of the positive class for one row
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.predict_raw(row))
    }

    /// Positive-class probabilities for every row of a dataset
    pub fn predict_proba_batch(&self, dataset: &Dataset) -> LearnResult<Vec<f64>> {
        if dataset.feature_names() != self.feature_names.as_slice() {
            return Err(LearnError::ShapeMismatch(format!(
                "model expects features {:?}, dataset has {:?}",
                self.feature_names,
                dataset.feature_names()
            )));
        }
        Ok(dataset
            .rows()
            .iter()
            .map(|row| self.predict_proba(row))
            .collect())
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> LearnResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Write the model to `<dir>/insurance_model.pkl`, creating `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> LearnResult<SavedModel> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| LearnError::io(dir, e))?;

        let path = dir.join(MODEL_FILE_NAME);
        let bytes = self.to_bytes()?;
        std::fs::write(&path, &bytes).map_err(|e| LearnError::io(&path, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let sha256 = format!("{:x}", hasher.finalize());

        info!(path = %path.display(), sha256 = %sha256, bytes = bytes.len(), "Model saved");
        Ok(SavedModel { path, sha256 })
    }

    /// Read a model written by [`GradientBoostedClassifier::save`]
    pub fn load(path: impl AsRef<Path>) -> LearnResult<Self> {
        let path = path.as_ref();
        let file = if path.is_dir() {
            path.join(MODEL_FILE_NAME)
        } else {
            path.to_path_buf()
        };
        let bytes = std::fs::read(&file).map_err(|e| LearnError::io(&file, e))?;
        let model: Self = serde_json::from_slice(&bytes)?;
        if model.format_version != MODEL_FORMAT_VERSION {
            return Err(LearnError::Serialization(format!(
                "unsupported model format version {}",
                model.format_version
            )));
        }
        Ok(model)
    }
}
