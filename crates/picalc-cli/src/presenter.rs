//! CLI result presenter and progress reporter.

use std::sync::Arc;

use indicatif::{MultiProgress, ProgressDrawTarget};
use parking_lot::Mutex;
use tracing::debug;

use picalc_core::formula::Formula;
use picalc_core::observer::ProgressListener;
use picalc_orchestration::interfaces::{CalculationResult, ProgressReporter, ResultPresenter};

use crate::output::{format_duration, format_number, format_result};
use crate::progress_bar::ProgressBarListener;
use crate::ui;

/// CLI result presenter.
pub struct CLIResultPresenter {
    verbose: bool,
    quiet: bool,
}

impl CLIResultPresenter {
    #[must_use]
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }
}

impl ResultPresenter for CLIResultPresenter {
    fn present_result(&self, result: &CalculationResult, details: bool) {
        let value = match &result.outcome {
            Ok(value) => value,
            Err(e) => {
                self.present_error(&format!("{}: {e}", result.formula));
                return;
            }
        };

        if self.quiet {
            println!("{value}");
            return;
        }

        println!("Formula: {}", result.formula);
        println!("Iterations: {}", format_number(result.iterations));
        println!("Precision: {}", result.precision);
        println!("Duration: {}", format_duration(result.duration));

        if details {
            println!("Terms summed: {}", format_number(result.iterations + 1));
            println!("Significant digits: {}", value.significant_digits());
        }

        println!("pi = {}", format_result(value, self.verbose));
    }

    fn present_comparison(&self, results: &[CalculationResult]) {
        if self.quiet {
            return;
        }

        ui::print_header("Comparison");
        for result in results {
            let status = if result.outcome.is_err() { "ERROR" } else { "OK" };
            println!(
                "  {:<12} {:>10} {:>12} [{}]",
                result.formula.name(),
                format_number(result.iterations),
                format_duration(result.duration),
                status,
            );
        }
    }

    fn present_error(&self, error: &str) {
        ui::print_error(error);
    }
}

/// Progress reporter drawing one bar per formula on stderr.
pub struct CLIProgressReporter {
    multi: MultiProgress,
    bars: Mutex<Vec<Arc<ProgressBarListener>>>,
}

impl CLIProgressReporter {
    /// Reporter drawing to stderr (hidden when stderr is not a terminal).
    #[must_use]
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Reporter drawing to `target`.
    #[must_use]
    pub fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Mutex::new(Vec::new()),
        }
    }

    /// Number of bars created so far.
    #[must_use]
    pub fn bar_count(&self) -> usize {
        self.bars.lock().len()
    }
}

impl Default for CLIProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for CLIProgressReporter {
    fn begin(&self, formula: Formula, terms: u64) -> Option<Arc<dyn ProgressListener>> {
        debug!(%formula, terms, "attaching progress bar");
        let listener = Arc::new(ProgressBarListener::new(&self.multi, formula, terms));
        self.bars.lock().push(Arc::clone(&listener));
        Some(listener)
    }

    fn complete(&self) {
        for bar in self.bars.lock().drain(..) {
            bar.finish();
        }
    }
}
