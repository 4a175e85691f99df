//! Error handling and exit codes.

use picalc_core::calculator::SeriesError;
use picalc_core::constants::exit_codes;
use picalc_orchestration::interfaces::CalculationResult;

/// Exit code for a calculation error.
pub fn handle_error(err: &SeriesError) -> i32 {
    match err {
        SeriesError::ComputationFailed(_) => exit_codes::ERROR_GENERIC,
        SeriesError::InvalidArgument(_) | SeriesError::Config(_) => exit_codes::ERROR_CONFIG,
        SeriesError::Cancelled => exit_codes::ERROR_CANCELED,
        SeriesError::Timeout(_) => exit_codes::ERROR_TIMEOUT,
        SeriesError::Mismatch => exit_codes::ERROR_MISMATCH,
    }
}

/// Exit code for an error that escaped to the top level.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<SeriesError>()
        .map_or(exit_codes::ERROR_GENERIC, handle_error)
}

/// Exit code of a finished run: the first failed calculation wins, then a
/// failed cross-check.
pub fn run_exit_code(
    results: &[CalculationResult],
    comparison: Option<&Result<(), SeriesError>>,
) -> i32 {
    results
        .iter()
        .find_map(|r| r.outcome.as_ref().err())
        .or_else(|| comparison.and_then(|c| c.as_ref().err()))
        .map_or(exit_codes::SUCCESS, handle_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use picalc_core::formula::Formula;
    use picalc_core::precision::Precision;
    use std::time::Duration;

    fn result(outcome: Result<&str, SeriesError>) -> CalculationResult {
        CalculationResult {
            formula: Formula::Chudnovsky,
            iterations: 0,
            precision: Precision::default(),
            outcome: outcome.map(|v| v.parse().unwrap()),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn error_codes() {
        assert_eq!(handle_error(&SeriesError::Cancelled), 130);
        assert_eq!(handle_error(&SeriesError::Timeout("5m".into())), 2);
        assert_eq!(handle_error(&SeriesError::Mismatch), 3);
        assert_eq!(handle_error(&SeriesError::Config("bad".into())), 4);
        assert_eq!(handle_error(&SeriesError::InvalidArgument("-1".into())), 4);
        assert_eq!(handle_error(&SeriesError::ComputationFailed("x".into())), 1);
    }

    #[test]
    fn anyhow_errors() {
        let err = anyhow::Error::from(SeriesError::Cancelled);
        assert_eq!(exit_code(&err), 130);
        assert_eq!(exit_code(&anyhow::anyhow!("disk full")), 1);
    }

    #[test]
    fn run_codes() {
        let ok = result(Ok("3.14"));
        assert_eq!(run_exit_code(&[ok.clone()], None), 0);
        assert_eq!(run_exit_code(&[ok.clone()], Some(&Ok(()))), 0);
        assert_eq!(
            run_exit_code(&[ok.clone(), ok.clone()], Some(&Err(SeriesError::Mismatch))),
            3
        );
        let timed_out = result(Err(SeriesError::Timeout("1s".into())));
        assert_eq!(
            run_exit_code(&[ok, timed_out], Some(&Err(SeriesError::Mismatch))),
            2
        );
    }
}
