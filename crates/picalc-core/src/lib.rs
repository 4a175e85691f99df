//! # picalc-core
//!
//! Concurrent arbitrary-precision series engine for π.
//! Terms of the Chudnovsky and Bailey–Borwein–Plouffe series are computed
//! as independent tasks on a rayon pool, reduced with a balanced tree and
//! reported to progress listeners as they complete.

pub mod calculator;
pub mod constants;
pub mod decimal;
pub mod factorial;
pub mod formula;
pub mod mapper;
pub mod observer;
pub mod observers;
pub mod precision;
pub mod progress;
pub mod reduction;
pub mod registry;
pub mod task;

// Re-exports
pub use calculator::{SeriesCalculator, SeriesError};
pub use constants::{exit_codes, DEFAULT_PRECISION_DIGITS, GUARD_DIGITS};
pub use decimal::Decimal;
pub use formula::Formula;
pub use mapper::PrecisionIterationMapper;
pub use observer::{ProgressHub, ProgressListener};
pub use precision::{Precision, RoundingPolicy};
pub use progress::{CancellationToken, ProgressEvent, TermResult};
pub use registry::{CalculatorFactory, DefaultFactory};
pub use task::{Executor, Task, TaskScope, TaskStatus};

/// π to `digits` significant digits, truncated.
///
/// Convenience wrapper over the Chudnovsky calculator on a default-sized
/// pool. For progress, cancellation or another formula use
/// [`SeriesCalculator`] directly.
///
/// # Example
/// ```
/// let pi = picalc_core::pi(21).unwrap();
/// assert_eq!(pi.to_string(), "3.14159265358979323846");
/// ```
pub fn pi(digits: u32) -> Result<Decimal, SeriesError> {
    let target = Precision::new(digits, RoundingPolicy::Down)?;
    let working = target.with_digits(digits.saturating_add(GUARD_DIGITS))?;
    let calculator = SeriesCalculator::new(Formula::Chudnovsky, Executor::new(0)?);
    let iterations = calculator.iterations_for(i64::from(working.digits()))?;
    let iterations = i64::try_from(iterations)
        .map_err(|_| SeriesError::InvalidArgument(format!("{digits} digits is too many")))?;
    Ok(calculator.calculate_with(iterations, working)?.round(target))
}
