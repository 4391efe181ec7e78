//! Process exit codes

use model_gate_service::ServiceError;
use std::process::ExitCode;

/// Success
pub const EXIT_SUCCESS: u8 = 0;
/// Any failure without a dedicated code
pub const EXIT_FAILURE: u8 = 1;
/// The candidate did not beat the production model
pub const EXIT_REJECTED: u8 = 2;
/// The evaluated run has no value for the metric
pub const EXIT_MISSING_METRIC: u8 = 3;

/// Exit code for a service error
pub fn code_for_service_error(err: &ServiceError) -> u8 {
    if err.is_rejection() {
        EXIT_REJECTED
    } else if err.is_missing_metric() {
        EXIT_MISSING_METRIC
    } else {
        EXIT_FAILURE
    }
}

/// Exit code for any error, looking through context layers
pub fn code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ServiceError>())
        .map(code_for_service_error)
        .unwrap_or(EXIT_FAILURE)
}

/// Convert a command result into the process exit code, reporting failures on stderr
pub fn finish(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(code_for(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use model_gate_core::PromotionPolicy;

    #[test]
    fn test_rejection_code() {
        let rejection = PromotionPolicy::default()
            .decide(0.1, Some(0.2))
            .into_result()
            .unwrap_err();
        let err = anyhow::Error::from(ServiceError::from(rejection));
        assert_eq!(code_for(&err), EXIT_REJECTED);
    }

    #[test]
    fn test_missing_metric_code_through_context() {
        let result: Result<(), ServiceError> = Err(ServiceError::MissingMetric {
            run_id: "r".to_string(),
            metric: "auc".to_string(),
        });
        let err = result.context("promotion failed").unwrap_err();
        assert_eq!(code_for(&err), EXIT_MISSING_METRIC);
    }

    #[test]
    fn test_other_errors_are_generic_failures() {
        let err = anyhow::Error::from(ServiceError::Internal("boom".to_string()));
        assert_eq!(code_for(&err), EXIT_FAILURE);
        assert_eq!(code_for(&anyhow::anyhow!("plain")), EXIT_FAILURE);
    }
}
