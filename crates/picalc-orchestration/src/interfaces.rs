//! Orchestration interfaces.

use std::sync::Arc;
use std::time::Duration;

use picalc_core::calculator::SeriesError;
use picalc_core::decimal::Decimal;
use picalc_core::formula::Formula;
use picalc_core::observer::ProgressListener;
use picalc_core::precision::Precision;

/// Trait for reporting progress to the user.
pub trait ProgressReporter: Send + Sync {
    /// A calculation of `terms` terms is about to start. The returned
    /// listener is registered with the calculator until it finishes.
    fn begin(&self, formula: Formula, terms: u64) -> Option<Arc<dyn ProgressListener>>;

    /// Every calculation has finished.
    fn complete(&self);
}

/// Trait for presenting results to the user.
pub trait ResultPresenter: Send + Sync {
    /// Present a calculation result.
    fn present_result(&self, result: &CalculationResult, details: bool);

    /// Present a comparison between formulas.
    fn present_comparison(&self, results: &[CalculationResult]);

    /// Present an error.
    fn present_error(&self, error: &str);
}

/// Result of a single calculation.
#[derive(Debug, Clone)]
pub struct CalculationResult {
    /// Formula evaluated.
    pub formula: Formula,
    /// Highest term index summed.
    pub iterations: u64,
    /// Precision of the reported value.
    pub precision: Precision,
    /// The computed value or a structured error.
    pub outcome: Result<Decimal, SeriesError>,
    /// Wall-clock duration.
    pub duration: Duration,
}

/// Null progress reporter (does nothing).
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn begin(&self, _formula: Formula, _terms: u64) -> Option<Arc<dyn ProgressListener>> {
        None
    }

    fn complete(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reporter() {
        let reporter = NullProgressReporter;
        assert!(reporter.begin(Formula::Chudnovsky, 10).is_none());
        reporter.complete();
    }

    #[test]
    fn calculation_result() {
        let result = CalculationResult {
            formula: Formula::BaileyBorweinPlouffe,
            iterations: 3,
            precision: Precision::default(),
            outcome: Ok(Decimal::from(3u32)),
            duration: Duration::from_millis(100),
        };
        assert_eq!(result.formula.name(), "bbp");
        assert!(result.outcome.is_ok());
    }
}
