//! Promotion service
//!
//! Runs the promotion gate as a straight line of steps:
//!
//! 1. Fetch the candidate run's metric; stop with
//!    [`ServiceError::MissingMetric`] if it is absent or NaN.
//! 2. Fetch the production model and its run's metric. No production model,
//!    no linked run and no metric all fall back to the sentinel `-1.0`.
//! 3. Compare under the configured [`PromotionPolicy`].
//! 4. On a pass, register the candidate as a new production version; on a
//!    failure return [`ServiceError::PromotionRejected`].
//!
//! The registry is never touched before step 4, so a missing metric or a
//! rejection leaves it unchanged.

use async_trait::async_trait;
use model_gate_core::model::validate_model_name;
use model_gate_core::{
    ArtifactPath, ModelRef, ModelSpec, ModelType, PromotionPolicy, RegisteredModel, RunId,
    PRODUCTION_LABEL, STAGE_TAG,
};
use model_gate_tracking::{MetricStore, ModelRegistry};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::dto::{PromoteRequest, Promoted, PromotionEvaluation};
use crate::error::{ServiceError, ServiceResult};

/// Trait for promotion operations
#[async_trait]
pub trait PromotionService: Send + Sync {
    /// Gather both metrics and decide, without writing anything
    async fn evaluate(&self, request: &PromoteRequest) -> ServiceResult<PromotionEvaluation>;

    /// Evaluate and, if the candidate passes, register it
    async fn promote(&self, request: PromoteRequest) -> ServiceResult<Promoted>;
}

/// Default implementation of PromotionService
pub struct DefaultPromotionService {
    metrics: Arc<dyn MetricStore>,
    registry: Arc<dyn ModelRegistry>,
    policy: PromotionPolicy,
}

impl DefaultPromotionService {
    /// Create a service with the default policy
    pub fn new(metrics: Arc<dyn MetricStore>, registry: Arc<dyn ModelRegistry>) -> Self {
        Self {
            metrics,
            registry,
            policy: PromotionPolicy::default(),
        }
    }

    /// Replace the comparison policy
    pub fn with_policy(mut self, policy: PromotionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PromotionPolicy {
        self.policy
    }

    async fn candidate_metric(&self, run_id: &RunId, metric: &str) -> ServiceResult<f64> {
        match self.metrics.get_metric(run_id, metric).await? {
            Some(value) if !value.is_nan() => Ok(value),
            Some(_) => {
                warn!(run_id = %run_id, metric = %metric, "Metric is NaN; treating as missing");
                Err(Self::missing(run_id, metric))
            }
            None => Err(Self::missing(run_id, metric)),
        }
    }

    fn missing(run_id: &RunId, metric: &str) -> ServiceError {
        ServiceError::MissingMetric {
            run_id: run_id.to_string(),
            metric: metric.to_string(),
        }
    }

    /// Production version and its metric, if both can be found
    async fn incumbent_metric(
        &self,
        model_name: &str,
        metric: &str,
    ) -> ServiceResult<(Option<ModelRef>, Option<f64>)> {
        let Some(incumbent) = self.registry.get_production_model(model_name).await? else {
            info!(
                model = %model_name,
                "No production model found; expected on the first deployment"
            );
            return Ok((None, None));
        };
        info!(model = %incumbent, "Found production model");

        let Some(run_id) = incumbent.run_id.clone() else {
            warn!(model = %incumbent, "Production model is not linked to a run");
            return Ok((Some(incumbent), None));
        };

        let value = self.metrics.get_metric(&run_id, metric).await?;
        match value {
            Some(v) if !v.is_nan() => {
                debug!(run_id = %run_id, metric = %metric, value = v, "Incumbent metric");
                Ok((Some(incumbent), Some(v)))
            }
            _ => {
                warn!(
                    run_id = %run_id,
                    metric = %metric,
                    "Production run has no usable metric value"
                );
                Ok((Some(incumbent), None))
            }
        }
    }

    fn build_spec(request: &PromoteRequest, new_metric: f64) -> ServiceResult<ModelSpec> {
        let description = request.description.clone().unwrap_or_else(|| {
            format!(
                "Promoted from run {} with {} = {:.5}",
                request.run_id, request.metric_name, new_metric
            )
        });

        Ok(ModelSpec::builder(
            request.model_name.clone(),
            ArtifactPath::for_run(&request.scope, &request.run_id),
        )
        .model_type(ModelType::CustomModel)
        .description(description)
        .tag(STAGE_TAG, PRODUCTION_LABEL)
        .label(PRODUCTION_LABEL)
        .run_id(&request.run_id)
        .build()?)
    }
}

#[async_trait]
impl PromotionService for DefaultPromotionService {
    #[instrument(skip(self, request), fields(run_id = %request.run_id, model = %request.model_name))]
    async fn evaluate(&self, request: &PromoteRequest) -> ServiceResult<PromotionEvaluation> {
        if request.metric_name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "metric name cannot be empty".to_string(),
            ));
        }
        validate_model_name(&request.model_name)?;

        let new_metric = self
            .candidate_metric(&request.run_id, &request.metric_name)
            .await?;
        info!(metric = %request.metric_name, value = new_metric, "Candidate metric");

        let (incumbent, incumbent_metric) = self
            .incumbent_metric(&request.model_name, &request.metric_name)
            .await?;
        let decision = self
            .policy
            .decide_against(new_metric, incumbent.is_some(), incumbent_metric);

        info!(
            new = decision.new_metric,
            incumbent = decision.incumbent_metric,
            tie_policy = %decision.tie_policy,
            promote = decision.promote,
            "Promotion decision"
        );

        Ok(PromotionEvaluation {
            run_id: request.run_id.clone(),
            model_name: request.model_name.clone(),
            metric_name: request.metric_name.clone(),
            incumbent,
            decision,
        })
    }

    #[instrument(skip(self, request), fields(run_id = %request.run_id, dry_run = request.dry_run))]
    async fn promote(&self, request: PromoteRequest) -> ServiceResult<Promoted> {
        let evaluation = self.evaluate(&request).await?;
        let decision = evaluation.decision.into_result()?;

        if request.dry_run {
            info!("Dry run; registry left unchanged");
            return Ok(Promoted {
                evaluation,
                registered: None,
            });
        }

        let spec = Self::build_spec(&request, decision.new_metric)?;
        let registered: RegisteredModel = self.registry.upsert(spec).await?;
        info!(
            model = %registered.name(),
            version = registered.version,
            "Registered new production model"
        );

        Ok(Promoted {
            evaluation,
            registered: Some(registered),
        })
    }
}
