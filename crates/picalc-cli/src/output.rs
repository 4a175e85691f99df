//! CLI output formatting and machine-readable reports.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use picalc_core::decimal::Decimal;
use picalc_core::formula::Formula;
use picalc_core::precision::RoundingPolicy;
use picalc_orchestration::interfaces::CalculationResult;

/// Characters kept on each side of a truncated value.
const TRUNCATE_KEEP: usize = 50;

/// Format a value for display. Long values are elided unless `verbose`.
#[must_use]
pub fn format_result(value: &Decimal, verbose: bool) -> String {
    let s = value.to_string();
    if verbose || s.len() <= 2 * TRUNCATE_KEEP {
        return s;
    }
    format!(
        "{}...{} ({} digits)",
        &s[..TRUNCATE_KEEP],
        &s[s.len() - TRUNCATE_KEEP..],
        value.significant_digits()
    )
}

/// Format a duration for display.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 0.001 {
        format!("{:.2}µs", secs * 1_000_000.0)
    } else if secs < 1.0 {
        format!("{:.2}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.3}s")
    } else {
        let mins = (secs / 60.0).floor() as u64;
        format!("{mins}m{:.1}s", secs - 60.0 * (secs / 60.0).floor())
    }
}

/// Format an integer with thousand separators.
#[must_use]
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Write `value` followed by a newline to `path`.
pub fn write_to_file(path: &Path, value: &Decimal) -> io::Result<()> {
    fs::write(path, format!("{value}\n"))
}

/// One calculation as it appears in a JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct CalculationReport {
    /// Formula name.
    pub formula: Formula,
    /// Highest term index summed.
    pub iterations: u64,
    /// Significant digits of `value`.
    pub digits: u32,
    /// Rounding policy applied.
    pub rounding: RoundingPolicy,
    /// Computed value, absent on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
    /// Error message, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

impl From<&CalculationResult> for CalculationReport {
    fn from(result: &CalculationResult) -> Self {
        let (value, error) = match &result.outcome {
            Ok(value) => (Some(value.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            formula: result.formula,
            iterations: result.iterations,
            digits: result.precision.digits(),
            rounding: result.precision.rounding(),
            value,
            error,
            duration_ms: result.duration.as_secs_f64() * 1000.0,
        }
    }
}

/// Full JSON document for a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// One entry per formula.
    pub results: Vec<CalculationReport>,
    /// Cross-validation verdict when more than one formula ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent: Option<bool>,
}

impl RunReport {
    /// Build a report from orchestration results.
    #[must_use]
    pub fn new(results: &[CalculationResult], consistent: Option<bool>) -> Self {
        Self {
            results: results.iter().map(CalculationReport::from).collect(),
            consistent,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
