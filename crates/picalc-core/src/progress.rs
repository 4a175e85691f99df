//! Progress event types and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use num_bigint::BigInt;

use crate::calculator::SeriesError;
use crate::decimal::Decimal;

/// A finished series term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermResult {
    /// Zero-based term index.
    pub index: u32,
    /// Term value, trailing zeros stripped.
    pub value: Decimal,
}

/// Notification emitted by the series pipeline.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A full term `k` has been computed.
    IterationCompleted {
        /// Term index.
        index: u32,
        /// Term value.
        value: Decimal,
    },
    /// The Chudnovsky nominator of term `k` is ready.
    NominatorReady {
        /// Term index.
        index: u32,
        /// Exact nominator.
        value: BigInt,
    },
    /// The Chudnovsky denominator of term `k` is ready.
    DenominatorReady {
        /// Term index.
        index: u32,
        /// Exact denominator.
        value: BigInt,
    },
    /// The formula constant has been evaluated.
    ConstantReady {
        /// Constant value at the requested precision.
        value: Decimal,
    },
}

impl ProgressEvent {
    /// Term index carried by the event, if any.
    #[must_use]
    pub fn index(&self) -> Option<u32> {
        match self {
            Self::IterationCompleted { index, .. }
            | Self::NominatorReady { index, .. }
            | Self::DenominatorReady { index, .. } => Some(*index),
            Self::ConstantReady { .. } => None,
        }
    }

    /// Short name of the event kind, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IterationCompleted { .. } => "iteration",
            Self::NominatorReady { .. } => "nominator",
            Self::DenominatorReady { .. } => "denominator",
            Self::ConstantReady { .. } => "constant",
        }
    }
}

impl From<TermResult> for ProgressEvent {
    fn from(term: TermResult) -> Self {
        Self::IterationCompleted {
            index: term.index,
            value: term.value,
        }
    }
}

/// Cooperative cancellation flag shared by every task of one calculation.
///
/// # Example
/// ```
/// use picalc_core::progress::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(token.check_cancelled().is_ok());
///
/// token.clone().cancel();
/// assert!(token.is_cancelled());
/// assert!(token.check_cancelled().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// `Err(SeriesError::Cancelled)` once cancellation was requested.
    pub fn check_cancelled(&self) -> Result<(), SeriesError> {
        if self.is_cancelled() {
            Err(SeriesError::Cancelled)
        } else {
            Ok(())
        }
    }
}
