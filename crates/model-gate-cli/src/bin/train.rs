//! Trainer entry point
//!
//! Prints `run_id=<id>` on stdout so a pipeline can hand the run to the
//! promoter; logs go to stderr.

use clap::Parser;
use model_gate_cli::commands::{run_train, training_summary};
use model_gate_cli::{bootstrap, exit, TrainArgs};
use std::process::ExitCode;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = TrainArgs::parse();
    let config = match bootstrap(&args.common) {
        Ok(config) => config,
        Err(err) => return exit::finish(Err(err)),
    };

    info!("Starting model-gate trainer");
    info!("Environment: {}", args.common.environment);

    let result = run_train(args, &config).await.map(|outcome| {
        for line in training_summary(&outcome) {
            println!("{}", line);
        }
    });
    exit::finish(result)
}
