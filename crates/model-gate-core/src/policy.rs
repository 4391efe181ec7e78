//! Promotion policy
//!
//! The gate compares a freshly trained run against the incumbent production
//! model on a single higher-is-better metric. When no incumbent exists its
//! metric is [`NO_INCUMBENT_METRIC`], so any non-negative score passes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::NO_INCUMBENT_METRIC;

/// Which model wins when both metrics are equal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TiePolicy {
    /// The new model replaces the incumbent on a tie
    PreferNew,
    /// The incumbent stays on a tie
    PreferIncumbent,
}

impl Default for TiePolicy {
    fn default() -> Self {
        TiePolicy::PreferNew
    }
}

impl TiePolicy {
    /// Kebab-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            TiePolicy::PreferNew => "prefer-new",
            TiePolicy::PreferIncumbent => "prefer-incumbent",
        }
    }
}

impl fmt::Display for TiePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TiePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "prefer-new" | "new" => Ok(TiePolicy::PreferNew),
            "prefer-incumbent" | "incumbent" => Ok(TiePolicy::PreferIncumbent),
            _ => Err(CoreError::InvalidTiePolicy(s.to_string())),
        }
    }
}

/// Rules applied when comparing a candidate against the incumbent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PromotionPolicy {
    /// Tie-breaking rule
    #[serde(default)]
    pub tie_policy: TiePolicy,
}

impl PromotionPolicy {
    /// Create a policy with the given tie rule
    pub fn new(tie_policy: TiePolicy) -> Self {
        Self { tie_policy }
    }

    /// Compare a candidate metric against the incumbent's
    ///
    /// `incumbent_metric` is `None` when no production model exists. A NaN
    /// incumbent is treated the same way. A NaN candidate never passes.
    pub fn decide(&self, new_metric: f64, incumbent_metric: Option<f64>) -> PromotionDecision {
        self.decide_against(new_metric, incumbent_metric.is_some(), incumbent_metric)
    }

    /// Like [`PromotionPolicy::decide`], for a production model that may
    /// exist without a usable metric
    ///
    /// `has_incumbent` records whether a production model was found; the
    /// comparison still uses the sentinel when its metric is missing or NaN.
    pub fn decide_against(
        &self,
        new_metric: f64,
        has_incumbent: bool,
        incumbent_metric: Option<f64>,
    ) -> PromotionDecision {
        let incumbent_metric = incumbent_metric
            .filter(|m| !m.is_nan())
            .unwrap_or(NO_INCUMBENT_METRIC);

        let promote = match self.tie_policy {
            TiePolicy::PreferNew => new_metric >= incumbent_metric,
            TiePolicy::PreferIncumbent => new_metric > incumbent_metric,
        };

        PromotionDecision {
            new_metric,
            incumbent_metric,
            has_incumbent,
            tie_policy: self.tie_policy,
            promote,
        }
    }
}

/// Outcome of comparing a candidate against the incumbent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PromotionDecision {
    /// Metric of the candidate run
    pub new_metric: f64,
    /// Metric of the incumbent, or the sentinel when there is none
    pub incumbent_metric: f64,
    /// Whether a production model was found
    pub has_incumbent: bool,
    /// Tie rule the decision was made under
    pub tie_policy: TiePolicy,
    /// Whether the candidate should be promoted
    pub promote: bool,
}

impl PromotionDecision {
    /// Turn a failing decision into a [`Rejection`]
    pub fn into_result(self) -> Result<Self, Rejection> {
        if self.promote {
            Ok(self)
        } else {
            Err(Rejection {
                new_metric: self.new_metric,
                incumbent_metric: self.incumbent_metric,
                tie_policy: self.tie_policy,
            })
        }
    }
}

/// The candidate did not beat the incumbent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    /// Metric of the candidate run
    pub new_metric: f64,
    /// Metric of the incumbent
    pub incumbent_metric: f64,
    /// Tie rule the decision was made under
    pub tie_policy: TiePolicy,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relation = if self.new_metric < self.incumbent_metric {
            "<"
        } else if self.new_metric == self.incumbent_metric {
            "ties"
        } else {
            "vs"
        };
        write!(
            f,
            "new model does not outperform the production model: {:.5} {} {:.5} ({})",
            self.new_metric, relation, self.incumbent_metric, self.tie_policy
        )
    }
}

impl std::error::Error for Rejection {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_better_model_promotes() {
        let decision = PromotionPolicy::default().decide(0.82, Some(0.80));
        assert!(decision.promote);
        assert!(decision.has_incumbent);
    }

    #[test]
    fn test_worse_model_rejected_with_both_values() {
        let rejection = PromotionPolicy::default()
            .decide(0.75, Some(0.80))
            .into_result()
            .unwrap_err();
        let message = rejection.to_string();
        assert!(message.contains("0.75000"));
        assert!(message.contains("0.80000"));
    }

    #[test]
    fn test_missing_incumbent_uses_sentinel() {
        let decision = PromotionPolicy::default().decide(0.0, None);
        assert!(decision.promote);
        assert!(!decision.has_incumbent);
        assert_eq!(decision.incumbent_metric, NO_INCUMBENT_METRIC);
    }

    #[test]
    fn test_incumbent_found_without_metric() {
        let decision = PromotionPolicy::default().decide_against(0.5, true, None);
        assert!(decision.promote);
        assert!(decision.has_incumbent);
        assert_eq!(decision.incumbent_metric, NO_INCUMBENT_METRIC);

        let decision = PromotionPolicy::default().decide_against(0.5, true, Some(f64::NAN));
        assert!(decision.has_incumbent);
        assert_eq!(decision.incumbent_metric, NO_INCUMBENT_METRIC);
    }

    #[test]
    fn test_tie_rejection_message() {
        let rejection = PromotionPolicy::new(TiePolicy::PreferIncumbent)
            .decide(0.8, Some(0.8))
            .into_result()
            .unwrap_err();
        let message = rejection.to_string();
        assert!(!message.contains(" < "), "{message}");
        assert!(message.contains("0.80000 ties 0.80000 (prefer-incumbent)"), "{message}");
    }

    #[test]
    fn test_tie_policies() {
        assert!(PromotionPolicy::new(TiePolicy::PreferNew).decide(0.8, Some(0.8)).promote);
        assert!(!PromotionPolicy::new(TiePolicy::PreferIncumbent).decide(0.8, Some(0.8)).promote);
    }

    #[test]
    fn test_nan_metrics() {
        let policy = PromotionPolicy::default();
        assert!(policy.decide(0.5, Some(f64::NAN)).promote);
        assert!(!policy.decide(f64::NAN, None).promote);
    }

    #[test]
    fn test_tie_policy_parsing() {
        assert_eq!("prefer_incumbent".parse::<TiePolicy>().unwrap(), TiePolicy::PreferIncumbent);
        assert_eq!("Prefer-New".parse::<TiePolicy>().unwrap(), TiePolicy::PreferNew);
        assert!("coin-flip".parse::<TiePolicy>().is_err());
    }
}
