//! Hold-out fit and evaluation

use tracing::info;

use crate::dataset::Dataset;
use crate::error::LearnResult;
use crate::gbdt::GradientBoostedClassifier;
use crate::metrics::roc_auc;
use crate::params::TrainingParams;
use crate::split::{train_test_split, DEFAULT_SPLIT_SEED, DEFAULT_TEST_SIZE};

/// Split settings for hold-out evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldOut {
    pub test_size: f64,
    pub seed: u64,
}

impl Default for HoldOut {
    fn default() -> Self {
        Self {
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

/// Fitted model with its held-out score
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub model: GradientBoostedClassifier,
    pub auc: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Split, fit on the training rows and score ROC AUC on the held-out rows
pub fn fit_and_evaluate(
    dataset: &Dataset,
    params: &TrainingParams,
    hold_out: HoldOut,
) -> LearnResult<Evaluation> {
    let (train, test) = train_test_split(dataset, hold_out.test_size, hold_out.seed)?;
    info!(
        train_rows = train.n_rows(),
        test_rows = test.n_rows(),
        seed = hold_out.seed,
        "Split dataset"
    );

    let model = GradientBoostedClassifier::fit(&train, params)?;
    let scores = model.predict_proba_batch(&test)?;
    let auc = roc_auc(test.targets(), &scores)?;
    info!(auc = auc, "Held-out evaluation complete");

    Ok(Evaluation {
        model,
        auc,
        train_rows: train.n_rows(),
        test_rows: test.n_rows(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LearnError;

    fn dataset(n: usize, positive: impl Fn(usize) -> bool) -> Dataset {
        let rows = (0..n).map(|i| vec![i as f64, (i % 5) as f64]).collect();
        let targets = (0..n).map(|i| if positive(i) { 1.0 } else { 0.0 }).collect();
        Dataset::new(vec!["a".into(), "b".into()], rows, targets).unwrap()
    }

    #[test]
    fn test_threshold_concept_scores_high() {
        let data = dataset(200, |i| i >= 100);
        let params = TrainingParams {
            n_estimators: 20,
            min_child_samples: 5,
            ..TrainingParams::default()
        };
        let evaluation = fit_and_evaluate(&data, &params, HoldOut::default()).unwrap();
        assert_eq!(evaluation.test_rows, 40);
        assert_eq!(evaluation.train_rows, 160);
        assert!(evaluation.auc > 0.9, "auc was {}", evaluation.auc);
    }

    #[test]
    fn test_single_class_hold_out_is_an_error() {
        let data = dataset(50, |_| true);
        let params = TrainingParams {
            n_estimators: 2,
            min_child_samples: 1,
            ..TrainingParams::default()
        };
        let err = fit_and_evaluate(&data, &params, HoldOut::default()).unwrap_err();
        assert!(matches!(err, LearnError::UndefinedAuc(_)));
    }
}
