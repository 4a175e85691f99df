//! Series formulas for π and their decomposition into task graphs.
//!
//! Each term is split into independent sub-expressions submitted as
//! separate tasks and joined with `combine`; only the final division or
//! multiplication of a term is serial.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::calculator::SeriesError;
use crate::constants::{
    BBP_BASE, CHUDNOVSKY_LINEAR, CHUDNOVSKY_MULTIPLIER, CHUDNOVSKY_OFFSET,
    CHUDNOVSKY_POWER_BASE, CHUDNOVSKY_SQRT_ARGUMENT, CHUDNOVSKY_TERM_RATIO,
};
use crate::decimal::Decimal;
use crate::factorial::FactorialCache;
use crate::mapper::PrecisionIterationMapper;
use crate::observer::ProgressHub;
use crate::precision::Precision;
use crate::progress::{ProgressEvent, TermResult};
use crate::task::{Task, TaskScope};

/// Supported series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Formula {
    /// `1/π = 12 Σ (-1)^k (6k)! (545140134k + 13591409) / ((3k)! (k!)^3 640320^(3k+3/2))`.
    #[default]
    Chudnovsky,
    /// `π = Σ 1/16^k (4/(8k+1) - 2/(8k+4) - 1/(8k+5) - 1/(8k+6))`.
    #[serde(rename = "bbp")]
    BaileyBorweinPlouffe,
}

/// Everything a term task needs, shared by one calculation.
#[derive(Clone)]
pub(crate) struct SeriesContext {
    pub(crate) scope: TaskScope,
    pub(crate) precision: Precision,
    pub(crate) factorials: Arc<FactorialCache>,
    pub(crate) progress: Arc<ProgressHub>,
}

impl Formula {
    /// All formulas, in declaration order.
    pub const ALL: [Formula; 2] = [Self::Chudnovsky, Self::BaileyBorweinPlouffe];

    /// Short name accepted on the command line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Chudnovsky => "chudnovsky",
            Self::BaileyBorweinPlouffe => "bbp",
        }
    }

    /// Decimal digits gained per additional term.
    #[must_use]
    pub fn digits_per_iteration(self) -> f64 {
        match self {
            Self::Chudnovsky => CHUDNOVSKY_TERM_RATIO.log10(),
            Self::BaileyBorweinPlouffe => f64::from(BBP_BASE).log10(),
        }
    }

    /// Precision/iteration mapper for this formula.
    #[must_use]
    pub fn mapper(self) -> PrecisionIterationMapper {
        PrecisionIterationMapper::for_formula(self)
    }

    /// Task producing term `k`.
    pub(crate) fn term_task(self, ctx: &SeriesContext, k: u32) -> Task<TermResult> {
        match self {
            Self::Chudnovsky => chudnovsky_term(ctx, k),
            Self::BaileyBorweinPlouffe => bbp_term(ctx, k),
        }
    }

    /// Task producing the constant the sum is combined with, if any.
    pub(crate) fn constant_task(self, ctx: &SeriesContext) -> Option<Task<Decimal>> {
        match self {
            Self::Chudnovsky => Some(chudnovsky_constant(ctx)),
            Self::BaileyBorweinPlouffe => None,
        }
    }

    /// Final value from the optional constant and the reduced sum.
    pub(crate) fn finish(
        self,
        constant: Option<&Decimal>,
        sum: &Decimal,
        precision: Precision,
    ) -> Result<Decimal, SeriesError> {
        match (self, constant) {
            (Self::Chudnovsky, Some(constant)) => constant.div(sum, precision),
            (Self::Chudnovsky, None) => Err(SeriesError::ComputationFailed(
                "chudnovsky sum requires its constant".into(),
            )),
            (Self::BaileyBorweinPlouffe, _) => Ok(sum.round(precision)),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Formula {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chudnovsky" => Ok(Self::Chudnovsky),
            "bbp" | "bailey-borwein-plouffe" => Ok(Self::BaileyBorweinPlouffe),
            other => Err(SeriesError::Config(format!("unknown formula: {other}"))),
        }
    }
}

fn index_multiple(ctx: &SeriesContext, k: u32, factor: u32) -> Result<u32, Task<TermResult>> {
    k.checked_mul(factor).ok_or_else(|| {
        ctx.scope.failed(SeriesError::InvalidArgument(format!(
            "term index {k} too large"
        )))
    })
}

fn chudnovsky_term(ctx: &SeriesContext, k: u32) -> Task<TermResult> {
    let (six_k, three_k) = match (index_multiple(ctx, k, 6), index_multiple(ctx, k, 3)) {
        (Ok(six_k), Ok(three_k)) => (six_k, three_k),
        (Err(failed), _) | (_, Err(failed)) => return failed,
    };
    let scope = &ctx.scope;
    let precision = ctx.precision;

    let factorials = Arc::clone(&ctx.factorials);
    let six_fact = scope.submit(move || factorials.get(six_k));
    let linear = scope.submit(move || {
        BigInt::from(CHUDNOVSKY_LINEAR) * k + BigInt::from(CHUDNOVSKY_OFFSET)
    });

    let factorials = Arc::clone(&ctx.factorials);
    let three_fact = scope.submit(move || factorials.get(three_k));
    let factorials = Arc::clone(&ctx.factorials);
    let k_fact_cubed = scope.submit(move || factorials.get(k).pow(3));
    let power = scope.submit(move || BigInt::from(CHUDNOVSKY_POWER_BASE).pow(k));

    let progress = Arc::clone(&ctx.progress);
    let nominator = six_fact.combine(&linear, move |fact: Arc<BigUint>, linear: BigInt| {
        let value = BigInt::from(fact.as_ref().clone()) * linear;
        progress.emit(|| ProgressEvent::NominatorReady {
            index: k,
            value: value.clone(),
        });
        value
    });

    let progress = Arc::clone(&ctx.progress);
    let denominator = three_fact
        .combine(&k_fact_cubed, |a: Arc<BigUint>, b: BigUint| a.as_ref() * b)
        .combine(&power, move |factorials: BigUint, power: BigInt| {
            let value = BigInt::from(factorials) * power;
            progress.emit(|| ProgressEvent::DenominatorReady {
                index: k,
                value: value.clone(),
            });
            value
        });

    let progress = Arc::clone(&ctx.progress);
    nominator.try_combine(&denominator, move |nominator, denominator| {
        let term = TermResult {
            index: k,
            value: Decimal::from(nominator)
                .div(&Decimal::from(denominator), precision)?
                .strip_trailing_zeros(),
        };
        trace!(k, "chudnovsky term ready");
        progress.emit(|| ProgressEvent::from(term.clone()));
        Ok(term)
    })
}

fn chudnovsky_constant(ctx: &SeriesContext) -> Task<Decimal> {
    let precision = ctx.precision;
    let progress = Arc::clone(&ctx.progress);
    ctx.scope
        .try_submit(move || Decimal::from(CHUDNOVSKY_SQRT_ARGUMENT).sqrt(precision))
        .map(move |root| {
            let constant = (&root * &Decimal::from(CHUDNOVSKY_MULTIPLIER))
                .round(precision)
                .strip_trailing_zeros();
            progress.emit(|| ProgressEvent::ConstantReady {
                value: constant.clone(),
            });
            constant
        })
}

fn bbp_term(ctx: &SeriesContext, k: u32) -> Task<TermResult> {
    let scope = &ctx.scope;
    let precision = ctx.precision;
    let eight_k = u64::from(k) * 8;

    let fraction = |numerator: u32, offset: u64| {
        scope.try_submit(move || {
            Decimal::from(numerator).div(&Decimal::from(eight_k + offset), precision)
        })
    };
    let difference = fraction(4, 1)
        .combine(&fraction(2, 4), |a, b| &a - &b)
        .combine(&fraction(1, 5), |a, b| &a - &b)
        .combine(&fraction(1, 6), |a, b| &a - &b);

    let power = scope.try_submit(move || {
        Decimal::one().div(&Decimal::from(BBP_BASE).pow(k), precision)
    });

    let progress = Arc::clone(&ctx.progress);
    power.combine(&difference, move |power, difference| {
        let term = TermResult {
            index: k,
            value: (&power * &difference).round(precision).strip_trailing_zeros(),
        };
        trace!(k, "bbp term ready");
        progress.emit(|| ProgressEvent::from(term.clone()));
        term
    })
}
