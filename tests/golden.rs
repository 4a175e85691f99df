//! Golden file integration tests.
//!
//! Reads tests/testdata/pi_golden.json and checks both formulas against
//! known digits of pi, through the orchestrator and the calculator directly.

use std::sync::Arc;

use serde::Deserialize;

use picalc_core::calculator::SeriesCalculator;
use picalc_core::formula::Formula;
use picalc_core::precision::{Precision, RoundingPolicy};
use picalc_core::progress::CancellationToken;
use picalc_core::task::Executor;
use picalc_orchestration::interfaces::NullProgressReporter;
use picalc_orchestration::orchestrator::{execute_calculations, CalculationRequest};
use picalc_tests::{pi_truncated, PI_DIGITS};

// ---------------------------------------------------------------------------
// Golden data
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct GoldenData {
    #[allow(dead_code)]
    description: String,
    values: Vec<GoldenEntry>,
}

#[derive(Deserialize)]
struct GoldenEntry {
    formula: Formula,
    #[serde(default)]
    iterations: Option<i64>,
    digits: u32,
    #[serde(default)]
    rounding: RoundingPolicy,
    expected: String,
}

fn load_golden_data() -> GoldenData {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/testdata/pi_golden.json");
    let data = std::fs::read_to_string(path).expect("failed to read golden file");
    serde_json::from_str(&data).expect("failed to parse golden JSON")
}

fn calculator(formula: Formula) -> Arc<SeriesCalculator> {
    Arc::new(SeriesCalculator::new(formula, Executor::new(4).unwrap()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn golden_file_parses() {
    let data = load_golden_data();
    assert!(!data.values.is_empty());
    assert!(data
        .values
        .iter()
        .any(|e| e.formula == Formula::BaileyBorweinPlouffe));
}

#[test]
fn golden_expectations_match_reference() {
    for entry in load_golden_data().values {
        if entry.rounding == RoundingPolicy::Down && entry.iterations.is_none() {
            assert_eq!(entry.expected, pi_truncated(usize::try_from(entry.digits).unwrap()));
        }
    }
}

#[test]
fn golden_through_orchestrator() {
    for entry in load_golden_data().values {
        let request = CalculationRequest {
            iterations: entry.iterations,
            digits: Some(entry.digits),
            rounding: entry.rounding,
            timeout: None,
        };
        let results = execute_calculations(
            &[calculator(entry.formula)],
            &request,
            &CancellationToken::new(),
            &NullProgressReporter,
        );
        let value = results[0].outcome.as_ref().unwrap();
        assert_eq!(
            value.to_string(),
            entry.expected,
            "{} at {} digits ({})",
            entry.formula,
            entry.digits,
            entry.rounding
        );
    }
}

#[test]
fn golden_through_calculator() {
    // Working precision ten digits above the target, then rounded down.
    for entry in load_golden_data().values {
        if entry.rounding != RoundingPolicy::Down {
            continue;
        }
        let calc = calculator(entry.formula);
        let target = Precision::new(entry.digits, RoundingPolicy::Down).unwrap();
        let working = target.with_digits(entry.digits + 10).unwrap();
        let iterations = match entry.iterations {
            Some(n) => n,
            None => i64::try_from(calc.iterations_for(i64::from(working.digits())).unwrap())
                .unwrap(),
        };
        let value = calc.calculate_with(iterations, working).unwrap().round(target);
        assert_eq!(value.to_string(), entry.expected, "{}", entry.formula);
    }
}

#[test]
fn convenience_pi_matches_reference() {
    let pi = picalc_core::pi(120).unwrap();
    assert_eq!(pi.to_string(), pi_truncated(120));
    assert!(PI_DIGITS.starts_with(&pi.to_string()));
}

#[test]
fn formulas_agree_on_shared_prefix() {
    let request = CalculationRequest {
        digits: Some(60),
        ..CalculationRequest::default()
    };
    let results = execute_calculations(
        &[calculator(Formula::Chudnovsky), calculator(Formula::BaileyBorweinPlouffe)],
        &request,
        &CancellationToken::new(),
        &NullProgressReporter,
    );
    let values: Vec<String> = results
        .iter()
        .map(|r| r.outcome.as_ref().unwrap().to_string())
        .collect();
    assert_eq!(values[0], values[1]);
    assert_eq!(values[0], pi_truncated(60));
}
