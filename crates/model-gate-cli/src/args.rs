//! Command-line arguments
//!
//! Flags keep the snake_case spelling the pipeline definitions already use
//! (`--data_path`, `--run_id`, ...).

use clap::{Args, Parser};
use model_gate_core::{RunId, TiePolicy, DEFAULT_METRIC_NAME, DEFAULT_MODEL_NAME};
use std::path::PathBuf;

/// Options shared by both binaries
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Configuration directory
    #[arg(short, long = "config_dir", env = "CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,

    /// Environment (development, production, etc.)
    #[arg(short, long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,

    /// Log level
    #[arg(long = "log_level", env = "MODEL_GATE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Train a classifier and log its held-out AUC
#[derive(Parser, Debug, Clone)]
#[command(name = "model-gate-train", author, version, about, long_about = None)]
pub struct TrainArgs {
    /// CSV file, or directory containing insurance.csv
    #[arg(long = "data_path")]
    pub data_path: PathBuf,

    /// JSON file with a `training` object
    #[arg(long = "training_parameters")]
    pub training_parameters: PathBuf,

    /// Directory the model file is written to
    #[arg(long = "model_output")]
    pub model_output: PathBuf,

    /// Metric name for the held-out AUC
    #[arg(long = "metric_name", default_value = DEFAULT_METRIC_NAME)]
    pub metric_name: String,

    /// MLflow tracking URI
    #[arg(long = "tracking_uri", env = "MLFLOW_TRACKING_URI")]
    pub tracking_uri: Option<String>,

    /// Bearer token for the tracking server
    #[arg(long = "tracking_token", env = "MLFLOW_TRACKING_TOKEN", hide_env_values = true)]
    pub tracking_token: Option<String>,

    /// Experiment new runs are created in
    #[arg(long = "experiment_id", env = "MLFLOW_EXPERIMENT_ID")]
    pub experiment_id: Option<String>,

    /// Existing run to log into
    #[arg(long = "run_id", env = "MLFLOW_RUN_ID")]
    pub run_id: Option<RunId>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Promote a run's model to production if it beats the current one
#[derive(Parser, Debug, Clone)]
#[command(name = "model-gate-promote", author, version, about, long_about = None)]
pub struct PromoteArgs {
    /// Run whose model is evaluated
    #[arg(long = "run_id")]
    pub run_id: RunId,

    /// Azure subscription id
    #[arg(long = "subscription_id")]
    pub subscription_id: String,

    /// Azure resource group
    #[arg(long = "resource_group")]
    pub resource_group: String,

    /// Azure ML workspace name
    #[arg(long = "workspace_name")]
    pub workspace_name: String,

    /// Registered model name
    #[arg(long = "model_name", default_value = DEFAULT_MODEL_NAME)]
    pub model_name: String,

    /// Metric compared between runs
    #[arg(long = "metric_name", default_value = DEFAULT_METRIC_NAME)]
    pub metric_name: String,

    /// prefer-new or prefer-incumbent
    #[arg(long = "tie_policy")]
    pub tie_policy: Option<TiePolicy>,

    /// Decide without registering
    #[arg(long = "dry_run")]
    pub dry_run: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}
