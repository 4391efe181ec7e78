//! Evaluation metrics

use crate::error::{LearnError, LearnResult};

/// Area under the ROC curve
///
/// Computed as the Mann-Whitney statistic over the positive class with
/// average ranks for tied scores, so a perfect ranking gives 1.0, a reversed
/// one 0.0 and constant scores 0.5. Labels must be 0.0 or 1.0 and both
/// classes must be present.
pub fn roc_auc(labels: &[f64], scores: &[f64]) -> LearnResult<f64> {
    if labels.len() != scores.len() {
        return Err(LearnError::ShapeMismatch(format!(
            "{} labels but {} scores",
            labels.len(),
            scores.len()
        )));
    }
    if scores.iter().any(|s| s.is_nan()) {
        return Err(LearnError::UndefinedAuc("scores contain NaN".to_string()));
    }

    let n_pos = labels.iter().filter(|&&y| y == 1.0).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(LearnError::UndefinedAuc(format!(
            "only one class present in {} labels",
            labels.len()
        )));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie group [start, end) shares their mean.
        let rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end]
            .iter()
            .filter(|&&i| labels[i] == 1.0)
            .count();
        positive_rank_sum += rank * positives as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Mean binary cross-entropy of probabilities
pub fn log_loss(labels: &[f64], probabilities: &[f64]) -> f64 {
    const EPS: f64 = 1e-15;
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = labels
        .iter()
        .zip(probabilities)
        .map(|(&y, &p)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / labels.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_ranking() {
        let auc = roc_auc(&[0.0, 0.0, 1.0, 1.0], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert_eq!(auc, 1.0);
    }

    #[test]
    fn test_reversed_ranking() {
        let auc = roc_auc(&[1.0, 1.0, 0.0, 0.0], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert_eq!(auc, 0.0);
    }

    #[test]
    fn test_constant_scores() {
        let auc = roc_auc(&[0.0, 1.0, 0.0, 1.0, 1.0], &[0.5; 5]).unwrap();
        assert_eq!(auc, 0.5);
    }

    #[test]
    fn test_partial_ranking_with_ties() {
        // Pairs (pos, neg): (0.8 > 0.1), (0.8 > 0.4), (0.4 = 0.4) -> 0.5, (0.4 > 0.1)
        let auc = roc_auc(&[1.0, 1.0, 0.0, 0.0], &[0.8, 0.4, 0.4, 0.1]).unwrap();
        assert!((auc - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_is_undefined() {
        let err = roc_auc(&[1.0, 1.0], &[0.2, 0.3]).unwrap_err();
        assert!(matches!(err, LearnError::UndefinedAuc(_)));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            roc_auc(&[1.0, 0.0], &[0.2]),
            Err(LearnError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_log_loss() {
        assert!(log_loss(&[1.0, 0.0], &[1.0, 0.0]) < 1e-12);
        assert!((log_loss(&[1.0], &[0.5]) - std::f64::consts::LN_2).abs() < 1e-12);
    }
}
