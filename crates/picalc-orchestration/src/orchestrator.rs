//! Core orchestration: bounded execution and result analysis.

use std::sync::Arc;
use std::time::{Duration, Instant};

use num_bigint::BigInt;
use tracing::{debug, warn};

use picalc_core::calculator::{SeriesCalculator, SeriesError};
use picalc_core::constants::{DEFAULT_PRECISION_DIGITS, GUARD_DIGITS};
use picalc_core::decimal::Decimal;
use picalc_core::formula::Formula;
use picalc_core::observer::ProgressListener;
use picalc_core::precision::{Precision, RoundingPolicy};
use picalc_core::progress::CancellationToken;
use picalc_core::task::Task;

use crate::interfaces::{CalculationResult, ProgressReporter};

/// How often a waiting caller checks for cancellation and the deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What the user asked for. Missing values are derived per formula.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculationRequest {
    /// Highest term index to sum.
    pub iterations: Option<i64>,
    /// Significant digits of the reported value.
    pub digits: Option<u32>,
    /// Rounding applied to the reported value and every intermediate.
    pub rounding: RoundingPolicy,
    /// Upper bound on the wall-clock time of all calculations.
    pub timeout: Option<Duration>,
}

impl CalculationRequest {
    /// Iteration count and reported precision for `formula`.
    ///
    /// With only `iterations`, the digits are those the terms deliver; with
    /// only `digits`, the iterations are the fewest that reach them; with
    /// neither, the default precision is used.
    pub fn resolve(&self, formula: Formula) -> Result<(i64, Precision), SeriesError> {
        let mapper = formula.mapper();
        let (iterations, digits) = match (self.iterations, self.digits) {
            (Some(n), Some(d)) => (n, d),
            (Some(n), None) => {
                let d = u32::try_from(mapper.precision_for(n)?).map_err(|_| {
                    SeriesError::InvalidArgument(format!("{n} iterations exceed supported precision"))
                })?;
                (n, d)
            }
            (None, d) => {
                let d = d.unwrap_or(DEFAULT_PRECISION_DIGITS);
                let n = i64::try_from(mapper.iterations_for(i64::from(d))?).map_err(|_| {
                    SeriesError::InvalidArgument(format!("{d} digits need too many iterations"))
                })?;
                (n, d)
            }
        };
        if iterations < 0 {
            return Err(SeriesError::InvalidArgument(format!(
                "iterations must be non-negative, got {iterations}"
            )));
        }
        Ok((iterations, Precision::new(digits, self.rounding)?))
    }
}

struct Running {
    calc: Arc<SeriesCalculator>,
    iterations: u64,
    precision: Precision,
    listener: Option<Arc<dyn ProgressListener>>,
    task: Result<Task<Decimal>, SeriesError>,
    started: Instant,
}

/// Run every calculator concurrently and collect one result per calculator.
///
/// All calculations are submitted before any is awaited. Tripping `cancel`
/// or exceeding the request timeout cancels whatever is still running.
pub fn execute_calculations(
    calculators: &[Arc<SeriesCalculator>],
    request: &CalculationRequest,
    cancel: &CancellationToken,
    reporter: &dyn ProgressReporter,
) -> Vec<CalculationResult> {
    let deadline = request.timeout.map(|t| (Instant::now() + t, t));
    let running: Vec<Running> = calculators
        .iter()
        .map(|calc| start(calc, request, reporter))
        .collect();
    let results = running
        .into_iter()
        .map(|run| finish(run, cancel, deadline))
        .collect();
    reporter.complete();
    results
}

fn start(
    calc: &Arc<SeriesCalculator>,
    request: &CalculationRequest,
    reporter: &dyn ProgressReporter,
) -> Running {
    let started = Instant::now();
    let formula = calc.formula();
    let (iterations, precision) = match request.resolve(formula) {
        Ok(resolved) => resolved,
        Err(e) => {
            return Running {
                calc: Arc::clone(calc),
                iterations: 0,
                precision: Precision::default(),
                listener: None,
                task: Err(e),
                started,
            }
        }
    };

    let terms = iterations.unsigned_abs() + 1;
    let listener = reporter.begin(formula, terms);
    if let Some(listener) = &listener {
        calc.add_listener(Arc::clone(listener));
    }
    debug!(%formula, iterations, %precision, "submitting calculation");
    let task = precision
        .with_digits(precision.digits().saturating_add(GUARD_DIGITS))
        .and_then(|working| calc.calculate_async_with(iterations, working));

    Running {
        calc: Arc::clone(calc),
        iterations: iterations.unsigned_abs(),
        precision,
        listener,
        task,
        started,
    }
}

fn finish(
    run: Running,
    cancel: &CancellationToken,
    deadline: Option<(Instant, Duration)>,
) -> CalculationResult {
    let formula = run.calc.formula();
    let outcome = match &run.task {
        Ok(task) => await_task(task, cancel, deadline),
        Err(e) => Err(e.clone()),
    }
    .map(|value| value.round(run.precision));

    run.calc.progress().flush();
    if let Some(listener) = &run.listener {
        run.calc.remove_listener(listener);
    }
    if let Err(e) = &outcome {
        warn!(%formula, error = %e, "calculation did not complete");
    }

    CalculationResult {
        formula,
        iterations: run.iterations,
        precision: run.precision,
        outcome,
        duration: run.started.elapsed(),
    }
}

fn await_task(
    task: &Task<Decimal>,
    cancel: &CancellationToken,
    deadline: Option<(Instant, Duration)>,
) -> Result<Decimal, SeriesError> {
    loop {
        if cancel.is_cancelled() {
            return if task.cancel_graph() {
                Err(SeriesError::Cancelled)
            } else {
                task.wait()
            };
        }
        if let Some((deadline, timeout)) = deadline {
            if Instant::now() >= deadline {
                return if task.cancel_graph() {
                    Err(SeriesError::Timeout(format!("{timeout:?}")))
                } else {
                    task.wait()
                };
            }
        }
        if let Some(outcome) = task.wait_timeout(POLL_INTERVAL) {
            return outcome;
        }
    }
}

/// Check that every successful result agrees with the first one.
///
/// Values may differ in their last couple of digits; anything beyond
/// 100 units of the coarsest last digit is a mismatch.
pub fn analyze_comparison_results(results: &[CalculationResult]) -> Result<(), SeriesError> {
    let valid: Vec<&Decimal> = results.iter().filter_map(|r| r.outcome.as_ref().ok()).collect();
    let Some((first, rest)) = valid.split_first() else {
        return Err(SeriesError::ComputationFailed("no valid results".into()));
    };

    let coarsest = valid.iter().map(|v| v.scale()).min().unwrap_or_default();
    let tolerance = Decimal::new(BigInt::from(100), coarsest);
    for value in rest {
        if (*value - *first).abs() > tolerance {
            return Err(SeriesError::Mismatch);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::NullProgressReporter;
    use picalc_core::observers::CountingListener;
    use picalc_core::registry::{CalculatorFactory, DefaultFactory};
    use picalc_core::task::Executor;

    const PI_30: &str = "3.14159265358979323846264338327";

    fn calc(formula: Formula) -> Arc<SeriesCalculator> {
        Arc::new(SeriesCalculator::new(formula, Executor::new(4).unwrap()))
    }

    fn result(formula: Formula, value: &str) -> CalculationResult {
        CalculationResult {
            formula,
            iterations: 1,
            precision: Precision::default(),
            outcome: Ok(value.parse().unwrap()),
            duration: Duration::from_millis(1),
        }
    }

    fn failed(formula: Formula) -> CalculationResult {
        CalculationResult {
            formula,
            iterations: 1,
            precision: Precision::default(),
            outcome: Err(SeriesError::Cancelled),
            duration: Duration::from_millis(1),
        }
    }

    #[test]
    fn resolve_from_digits() {
        let request = CalculationRequest {
            digits: Some(29),
            ..CalculationRequest::default()
        };
        let (n, p) = request.resolve(Formula::Chudnovsky).unwrap();
        assert_eq!(n, 2);
        assert_eq!(p.digits(), 29);
    }

    #[test]
    fn resolve_from_iterations() {
        let request = CalculationRequest {
            iterations: Some(1),
            rounding: RoundingPolicy::HalfUp,
            ..CalculationRequest::default()
        };
        let (n, p) = request.resolve(Formula::Chudnovsky).unwrap();
        assert_eq!(n, 1);
        assert_eq!(p.digits(), 28);
        assert_eq!(p.rounding(), RoundingPolicy::HalfUp);
    }

    #[test]
    fn resolve_defaults() {
        let (n, p) = CalculationRequest::default()
            .resolve(Formula::BaileyBorweinPlouffe)
            .unwrap();
        assert_eq!(p.digits(), DEFAULT_PRECISION_DIGITS);
        assert_eq!(n, 16);
    }

    #[test]
    fn resolve_rejects_invalid() {
        let negative = CalculationRequest {
            iterations: Some(-1),
            digits: Some(10),
            ..CalculationRequest::default()
        };
        assert!(matches!(
            negative.resolve(Formula::Chudnovsky),
            Err(SeriesError::InvalidArgument(_))
        ));
        let zero_digits = CalculationRequest {
            digits: Some(0),
            ..CalculationRequest::default()
        };
        assert!(zero_digits.resolve(Formula::Chudnovsky).is_err());
    }

    #[test]
    fn execute_single_formula() {
        let request = CalculationRequest {
            digits: Some(30),
            ..CalculationRequest::default()
        };
        let results = execute_calculations(
            &[calc(Formula::BaileyBorweinPlouffe)],
            &request,
            &CancellationToken::new(),
            &NullProgressReporter,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].iterations, 24);
        let value = results[0].outcome.as_ref().unwrap();
        assert_eq!(value.to_string(), PI_30);
    }

    #[test]
    fn execute_all_formulas_agree() {
        let factory = DefaultFactory::new(Executor::new(4).unwrap());
        let calcs: Vec<_> = factory
            .available()
            .into_iter()
            .map(|name| factory.get(name).unwrap())
            .collect();
        let request = CalculationRequest {
            digits: Some(50),
            ..CalculationRequest::default()
        };
        let results =
            execute_calculations(&calcs, &request, &CancellationToken::new(), &NullProgressReporter);
        assert_eq!(results.len(), 2);
        assert!(analyze_comparison_results(&results).is_ok());
    }

    #[test]
    fn invalid_request_yields_error_result() {
        let request = CalculationRequest {
            iterations: Some(-3),
            ..CalculationRequest::default()
        };
        let results = execute_calculations(
            &[calc(Formula::Chudnovsky)],
            &request,
            &CancellationToken::new(),
            &NullProgressReporter,
        );
        assert!(matches!(results[0].outcome, Err(SeriesError::InvalidArgument(_))));
    }

    #[test]
    fn cancelled_token_stops_calculation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = CalculationRequest {
            iterations: Some(3_000),
            digits: Some(40_000),
            ..CalculationRequest::default()
        };
        let results =
            execute_calculations(&[calc(Formula::Chudnovsky)], &request, &cancel, &NullProgressReporter);
        assert!(matches!(results[0].outcome, Err(SeriesError::Cancelled)));
    }

    #[test]
    fn timeout_stops_calculation() {
        let request = CalculationRequest {
            iterations: Some(3_000),
            digits: Some(40_000),
            timeout: Some(Duration::from_millis(1)),
            ..CalculationRequest::default()
        };
        let results = execute_calculations(
            &[calc(Formula::Chudnovsky)],
            &request,
            &CancellationToken::new(),
            &NullProgressReporter,
        );
        assert!(matches!(results[0].outcome, Err(SeriesError::Timeout(_))));
    }

    #[test]
    fn reporter_listener_sees_all_terms() {
        struct Reporter {
            listener: Arc<CountingListener>,
        }
        impl ProgressReporter for Reporter {
            fn begin(&self, _formula: Formula, _terms: u64) -> Option<Arc<dyn ProgressListener>> {
                Some(self.listener.clone())
            }
            fn complete(&self) {}
        }

        let reporter = Reporter {
            listener: Arc::new(CountingListener::new()),
        };
        let calculator = calc(Formula::Chudnovsky);
        let request = CalculationRequest {
            iterations: Some(9),
            ..CalculationRequest::default()
        };
        execute_calculations(
            &[Arc::clone(&calculator)],
            &request,
            &CancellationToken::new(),
            &reporter,
        );
        assert_eq!(reporter.listener.completed(), 10);
        assert!(!calculator.has_listener(&reporter.listener));
    }

    #[test]
    fn analyze_matching_results() {
        let results = vec![
            result(Formula::Chudnovsky, "3.14159265358979323846"),
            result(Formula::BaileyBorweinPlouffe, "3.14159265358979323846"),
        ];
        assert!(analyze_comparison_results(&results).is_ok());
    }

    #[test]
    fn analyze_tolerates_last_digit_noise() {
        let results = vec![
            result(Formula::Chudnovsky, "3.14159265358979323846"),
            result(Formula::BaileyBorweinPlouffe, "3.14159265358979323845"),
        ];
        assert!(analyze_comparison_results(&results).is_ok());
    }

    #[test]
    fn analyze_mismatching_results() {
        let results = vec![
            result(Formula::Chudnovsky, "3.14159265358979323846"),
            result(Formula::BaileyBorweinPlouffe, "3.14159265358979"),
            result(Formula::BaileyBorweinPlouffe, "3.1333333333333333333"),
        ];
        assert!(matches!(
            analyze_comparison_results(&results),
            Err(SeriesError::Mismatch)
        ));
    }

    #[test]
    fn analyze_ignores_failed_entries() {
        let results = vec![
            result(Formula::Chudnovsky, "3.14159"),
            failed(Formula::BaileyBorweinPlouffe),
        ];
        assert!(analyze_comparison_results(&results).is_ok());
    }

    #[test]
    fn analyze_no_valid_results() {
        assert!(matches!(
            analyze_comparison_results(&[failed(Formula::Chudnovsky)]),
            Err(SeriesError::ComputationFailed(_))
        ));
        assert!(matches!(
            analyze_comparison_results(&[]),
            Err(SeriesError::ComputationFailed(_))
        ));
    }
}
