//! Trainer and promoter command-line tools
//!
//! The two binaries share argument parsing, layered configuration,
//! telemetry setup and the mapping from failures to exit codes:
//!
//! - `model-gate-train` fits the classifier, logs the held-out AUC and
//!   prints `run_id=<id>` for the next pipeline step
//! - `model-gate-promote` registers the run's model as production when it
//!   beats the incumbent, exiting with 2 on rejection

use anyhow::Context;

pub mod args;
pub mod commands;
pub mod config;
pub mod exit;
pub mod telemetry;

pub use args::{CommonArgs, PromoteArgs, TrainArgs};
pub use config::GateConfig;

/// Load configuration, apply command-line overrides and start logging
///
/// A configuration file or `MODEL_GATE_*` variable that is present but
/// invalid is an error; only absent files fall back to defaults.
pub fn bootstrap(common: &CommonArgs) -> anyhow::Result<GateConfig> {
    let mut config = GateConfig::load(&common.config_dir, &common.environment)
        .with_context(|| {
            format!(
                "Failed to load configuration from {} ({})",
                common.config_dir.display(),
                common.environment
            )
        })?;

    if let Some(level) = &common.log_level {
        config.logging.level = level.clone();
    }

    if let Err(e) = telemetry::init(&config.logging) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
    Ok(config)
}
