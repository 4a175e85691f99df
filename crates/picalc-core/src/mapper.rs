//! Conversion between requested decimal precision and series iteration count.

use crate::calculator::SeriesError;
use crate::formula::Formula;

/// Maps digits to iterations using a formula's digit gain per term.
///
/// # Example
/// ```
/// use picalc_core::formula::Formula;
/// use picalc_core::mapper::PrecisionIterationMapper;
///
/// let mapper = PrecisionIterationMapper::for_formula(Formula::Chudnovsky);
/// assert_eq!(mapper.iterations_for(10_000).unwrap(), 705);
/// assert_eq!(mapper.precision_for(0).unwrap(), 14);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionIterationMapper {
    digits_per_iteration: f64,
}

impl PrecisionIterationMapper {
    /// Mapper for an explicit gain. The gain must be finite and positive.
    pub fn new(digits_per_iteration: f64) -> Result<Self, SeriesError> {
        if !digits_per_iteration.is_finite() || digits_per_iteration <= 0.0 {
            return Err(SeriesError::InvalidArgument(format!(
                "digits per iteration must be positive, got {digits_per_iteration}"
            )));
        }
        Ok(Self {
            digits_per_iteration,
        })
    }

    /// Mapper using the gain of `formula`.
    #[must_use]
    pub fn for_formula(formula: Formula) -> Self {
        Self {
            digits_per_iteration: formula.digits_per_iteration(),
        }
    }

    /// Digit gain per term.
    #[must_use]
    pub fn digits_per_iteration(&self) -> f64 {
        self.digits_per_iteration
    }

    /// Highest term index whose partial sum is guaranteed `precision` digits:
    /// `floor(precision / g)`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn iterations_for(&self, precision: i64) -> Result<u64, SeriesError> {
        if precision < 0 {
            return Err(SeriesError::InvalidArgument(format!(
                "precision must be non-negative, got {precision}"
            )));
        }
        Ok((precision as f64 / self.digits_per_iteration).floor() as u64)
    }

    /// Digits delivered by summing terms `0..=iterations`:
    /// `floor((iterations + 1) × g)`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn precision_for(&self, iterations: i64) -> Result<u64, SeriesError> {
        if iterations < 0 {
            return Err(SeriesError::InvalidArgument(format!(
                "iterations must be non-negative, got {iterations}"
            )));
        }
        Ok(((iterations as f64 + 1.0) * self.digits_per_iteration).floor() as u64)
    }
}
