//! Series calculator and the error type shared by the engine.
//!
//! `SeriesCalculator` turns an iteration count into a task graph: one task
//! tree per term, a balanced reduction over the terms, and a final combine
//! with the formula constant.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::decimal::Decimal;
use crate::factorial::FactorialCache;
use crate::formula::{Formula, SeriesContext};
use crate::mapper::PrecisionIterationMapper;
use crate::observer::{ProgressHub, ProgressListener};
use crate::precision::Precision;
use crate::reduction::ReductionTree;
use crate::task::{Executor, Task, TaskScope};

/// Error type for series calculations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SeriesError {
    /// Negative iteration count, precision or factorial argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A numeric step failed (division by zero, negative root, panic).
    #[error("computation failed: {0}")]
    ComputationFailed(String),

    /// The task or one of its ancestors was cancelled.
    #[error("calculation cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Calculation timed out.
    #[error("calculation timed out after {0}")]
    Timeout(String),

    /// Results from different formulas don't match.
    #[error("result mismatch between formulas")]
    Mismatch,
}

/// Validate a caller-supplied count and narrow it to a term index.
pub(crate) fn to_index(value: i64, what: &str) -> Result<u32, SeriesError> {
    if value < 0 {
        return Err(SeriesError::InvalidArgument(format!(
            "{what} must be non-negative, got {value}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| SeriesError::InvalidArgument(format!("{what} too large: {value}")))
}

/// Computes π with one [`Formula`] on a swappable [`Executor`].
///
/// The factorial cache and the listener registry live as long as the
/// calculator and are shared by all of its calculations.
///
/// # Example
/// ```
/// use picalc_core::calculator::SeriesCalculator;
/// use picalc_core::formula::Formula;
/// use picalc_core::task::Executor;
///
/// let calculator = SeriesCalculator::new(Formula::Chudnovsky, Executor::new(2).unwrap());
/// let pi = calculator.calculate(1).unwrap();
/// assert!(pi.to_string().starts_with("3.14159265358979323"));
/// ```
pub struct SeriesCalculator {
    formula: Formula,
    executor: RwLock<Executor>,
    factorials: Arc<FactorialCache>,
    progress: Arc<ProgressHub>,
    mapper: PrecisionIterationMapper,
}

impl SeriesCalculator {
    /// Create a calculator for `formula` running on `executor`.
    #[must_use]
    pub fn new(formula: Formula, executor: Executor) -> Self {
        Self {
            formula,
            executor: RwLock::new(executor),
            factorials: Arc::new(FactorialCache::new()),
            progress: Arc::new(ProgressHub::new()),
            mapper: formula.mapper(),
        }
    }

    /// Formula evaluated by this calculator.
    #[must_use]
    pub fn formula(&self) -> Formula {
        self.formula
    }

    /// Executor used by subsequent calculations.
    #[must_use]
    pub fn executor(&self) -> Executor {
        self.executor.read().clone()
    }

    /// Replace the executor. Calculations already submitted keep the old one.
    pub fn set_executor(&self, executor: Executor) {
        debug!(threads = executor.num_threads(), "executor replaced");
        *self.executor.write() = executor;
    }

    /// Factorial cache shared by this calculator's terms.
    #[must_use]
    pub fn factorials(&self) -> &Arc<FactorialCache> {
        &self.factorials
    }

    /// Listener registry.
    #[must_use]
    pub fn progress(&self) -> &Arc<ProgressHub> {
        &self.progress
    }

    /// π from terms `0..=iterations` at the default precision. Blocks.
    pub fn calculate(&self, iterations: i64) -> Result<Decimal, SeriesError> {
        self.calculate_with(iterations, Precision::default())
    }

    /// π from terms `0..=iterations` at `precision`. Blocks.
    pub fn calculate_with(
        &self,
        iterations: i64,
        precision: Precision,
    ) -> Result<Decimal, SeriesError> {
        self.calculate_async_with(iterations, precision)?.wait()
    }

    /// Pending π at the default precision.
    pub fn calculate_async(&self, iterations: i64) -> Result<Task<Decimal>, SeriesError> {
        self.calculate_async_with(iterations, Precision::default())
    }

    /// Pending π from terms `0..=iterations` at `precision`.
    ///
    /// Every task of the graph shares one cancellation token;
    /// [`Task::cancel_graph`] on the returned task stops queued terms from
    /// starting.
    pub fn calculate_async_with(
        &self,
        iterations: i64,
        precision: Precision,
    ) -> Result<Task<Decimal>, SeriesError> {
        let n = to_index(iterations, "iterations")?;
        let formula = self.formula;
        let scope = TaskScope::new(self.executor());
        let ctx = SeriesContext {
            scope: scope.clone(),
            precision,
            factorials: Arc::clone(&self.factorials),
            progress: Arc::clone(&self.progress),
        };
        debug!(%formula, iterations = n, %precision, "building series task graph");
        let started = Instant::now();

        let constant = formula.constant_task(&ctx);
        let terms = (0..=n).map(|k| formula.term_task(&ctx, k)).collect();
        let sum = ReductionTree::new(precision).reduce_terms(&scope, terms);

        let result = match constant {
            Some(constant) => constant.try_combine(&sum, move |constant, sum| {
                formula.finish(Some(&constant), &sum, precision)
            }),
            None => sum.try_map(move |sum| formula.finish(None, &sum, precision)),
        };

        result.on_complete(move |outcome| {
            #[allow(clippy::cast_possible_truncation)]
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match outcome {
                Ok(value) => info!(
                    %formula,
                    iterations = n,
                    digits = value.significant_digits(),
                    elapsed_ms,
                    "series calculation complete"
                ),
                Err(SeriesError::Cancelled) => {
                    warn!(%formula, iterations = n, elapsed_ms, "series calculation cancelled");
                }
                Err(e) => warn!(%formula, iterations = n, error = %e, "series calculation failed"),
            }
        });
        Ok(result)
    }

    /// Register a progress listener.
    pub fn add_listener(&self, listener: Arc<dyn ProgressListener>) -> bool {
        self.progress.add_listener(listener)
    }

    /// Unregister a progress listener.
    pub fn remove_listener<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.progress.remove_listener(listener)
    }

    /// Whether `listener` is registered.
    pub fn has_listener<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.progress.has_listener(listener)
    }

    /// Terms needed beyond the first for `precision` digits.
    pub fn iterations_for(&self, precision: i64) -> Result<u64, SeriesError> {
        self.mapper.iterations_for(precision)
    }

    /// Digits delivered by `iterations`.
    pub fn precision_for(&self, iterations: i64) -> Result<u64, SeriesError> {
        self.mapper.precision_for(iterations)
    }
}
