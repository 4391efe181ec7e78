//! Tabular learning for model-gate
//!
//! Everything the training step needs, without a dataframe or a native
//! booster library:
//! - [`Dataset`]: CSV loading with `target`/`id` handling
//! - [`train_test_split`]: seeded hold-out partitioning
//! - [`TrainingParams`]: LightGBM-style hyperparameters
//! - [`GradientBoostedClassifier`]: logistic gradient boosting over leaf-wise trees
//! - [`roc_auc`]: rank-based ROC AUC
//!
//! # Example
//!
//! ```rust,no_run
//! use model_gate_learn::{fit_and_evaluate, load_parameters, Dataset, HoldOut};
//!
//! # fn example() -> Result<(), model_gate_learn::LearnError> {
//! let dataset = Dataset::from_csv_path("data/")?;
//! let params = load_parameters("params.json")?;
//! let evaluation = fit_and_evaluate(&dataset, &params, HoldOut::default())?;
//! evaluation.model.save("outputs/")?;
//! println!("auc = {:.4}", evaluation.auc);
//! # Ok(())
//! # }
//! ```

pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod gbdt;
pub mod metrics;
pub mod params;
pub mod split;
pub mod tree;

pub use dataset::{resolve_data_file, Dataset, DEFAULT_DATA_FILE, ID_COLUMN, TARGET_COLUMN};
pub use error::{LearnError, LearnResult};
pub use evaluation::{fit_and_evaluate, Evaluation, HoldOut};
pub use gbdt::{GradientBoostedClassifier, SavedModel, MODEL_FILE_NAME};
pub use metrics::{log_loss, roc_auc};
pub use params::{load_parameters, parse_parameters, TrainingParams};
pub use split::{split_indices, train_test_split, SplitIndices, DEFAULT_SPLIT_SEED, DEFAULT_TEST_SIZE};
pub use tree::{Node, Tree};
