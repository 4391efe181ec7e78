//! Promoter entry point
//!
//! Exit codes: 0 promoted (or dry run passed), 2 rejected, 3 missing
//! metric, 1 anything else.

use clap::Parser;
use model_gate_cli::commands::{promotion_summary, run_promote};
use model_gate_cli::{bootstrap, exit, PromoteArgs};
use std::process::ExitCode;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = PromoteArgs::parse();
    let config = match bootstrap(&args.common) {
        Ok(config) => config,
        Err(err) => return exit::finish(Err(err)),
    };

    info!("Starting model-gate promoter");
    info!("Environment: {}", args.common.environment);

    let result = run_promote(args, &config).await.map(|promoted| {
        for line in promotion_summary(&promoted) {
            println!("{}", line);
        }
    });
    exit::finish(result)
}
