//! Command runners behind the two binaries

use anyhow::{Context, Result};
use model_gate_core::{PromotionPolicy, WorkspaceScope};
use model_gate_service::{
    DefaultPromotionService, DefaultTrainingService, PromoteRequest, Promoted, PromotionService,
    TrainOutcome, TrainRequest, TrainingService,
};
use model_gate_tracking::azure::{credential_from_env, AzureWorkspace};
use model_gate_tracking::{LocalTrackingStore, MlflowClient, TrackingResult, TrackingStore};
use secrecy::SecretString;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::args::{PromoteArgs, TrainArgs};
use crate::config::GateConfig;

/// Tracking store for a URI: MLflow over HTTP, or the local store when the
/// URI is unset, empty or a `file:` URI
pub fn tracking_store(
    uri: Option<&str>,
    token: Option<SecretString>,
    experiment_id: &str,
    local_root: &Path,
) -> TrackingResult<Arc<dyn TrackingStore>> {
    match uri.map(str::trim).filter(|u| !u.is_empty()) {
        None => {
            info!(root = %local_root.display(), "Using local tracking store");
            Ok(Arc::new(LocalTrackingStore::new(local_root)))
        }
        Some(uri) if uri.starts_with("file:") => {
            let store = LocalTrackingStore::from_uri(uri);
            info!(root = %store.root().display(), "Using local tracking store");
            Ok(Arc::new(store))
        }
        Some(uri) => {
            let mut client = MlflowClient::new(uri)?.with_experiment_id(experiment_id);
            if let Some(token) = token {
                client = client.with_token(token);
            }
            info!(tracking_uri = %client.base_url(), "Using MLflow tracking server");
            Ok(Arc::new(client))
        }
    }
}

/// Train, log and save; returns the outcome for printing
pub async fn run_train(args: TrainArgs, config: &GateConfig) -> Result<TrainOutcome> {
    let uri = args.tracking_uri.as_deref().or(config.tracking.uri.as_deref());
    let experiment_id = args
        .experiment_id
        .as_deref()
        .unwrap_or(&config.tracking.experiment_id);
    let tracking = tracking_store(
        uri,
        args.tracking_token.map(SecretString::new),
        experiment_id,
        &config.tracking.local_root,
    )
    .context("Failed to set up tracking store")?;

    let request = TrainRequest::new(args.data_path, args.training_parameters, args.model_output)
        .with_metric_name(args.metric_name)
        .with_run_id(args.run_id);

    let outcome = DefaultTrainingService::new(tracking)
        .train(request)
        .await?;
    Ok(outcome)
}

/// Resolve the workspace and run the promotion gate
pub async fn run_promote(args: PromoteArgs, config: &GateConfig) -> Result<Promoted> {
    let scope = WorkspaceScope::new(args.subscription_id, args.resource_group, args.workspace_name)
        .context("Invalid workspace coordinates")?;
    let endpoints = config
        .azure
        .endpoints()
        .context("Invalid Azure endpoint configuration")?;
    let credential = credential_from_env(&endpoints.authority_host)?;

    info!(workspace = %scope, "Resolving workspace");
    let clients = AzureWorkspace::new(scope.clone(), endpoints, credential)
        .connect()
        .await
        .context("Failed to resolve workspace")?;

    let tie_policy = args.tie_policy.unwrap_or(config.promotion.tie_policy);
    let service = DefaultPromotionService::new(clients.tracking, clients.registry)
        .with_policy(PromotionPolicy::new(tie_policy));

    let request = PromoteRequest::new(args.run_id, scope)
        .with_model_name(args.model_name)
        .with_metric_name(args.metric_name)
        .with_dry_run(args.dry_run || config.promotion.dry_run);

    Ok(service.promote(request).await?)
}

/// Lines printed on stdout after a successful promotion
pub fn promotion_summary(promoted: &Promoted) -> Vec<String> {
    let decision = &promoted.evaluation.decision;
    let mut lines = vec![
        format!("new_metric={:.5}", decision.new_metric),
        format!("incumbent_metric={:.5}", decision.incumbent_metric),
    ];
    match &promoted.registered {
        Some(model) => {
            lines.push(format!("model_name={}", model.name()));
            lines.push(format!("model_version={}", model.version));
        }
        None => lines.push("dry_run=true".to_string()),
    }
    lines
}

/// Lines printed on stdout after training
pub fn training_summary(outcome: &TrainOutcome) -> Vec<String> {
    vec![
        format!("run_id={}", outcome.run_id),
        format!("{}={}", outcome.metric_name, outcome.metric_value),
        format!("model_path={}", outcome.model_path.display()),
    ]
}
