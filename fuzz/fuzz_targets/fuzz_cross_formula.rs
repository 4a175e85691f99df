#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use picalc_core::calculator::SeriesCalculator;
use picalc_core::formula::Formula;
use picalc_core::progress::CancellationToken;
use picalc_core::task::Executor;
use picalc_orchestration::interfaces::NullProgressReporter;
use picalc_orchestration::orchestrator::{
    analyze_comparison_results, execute_calculations, CalculationRequest,
};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    // Digits capped at 300 to keep BBP fast.
    let digits = u32::from(u16::from_le_bytes([data[0], data[1]])) % 300 + 1;

    let executor = Executor::new(2).unwrap();
    let calculators: Vec<Arc<SeriesCalculator>> = Formula::ALL
        .iter()
        .map(|&f| Arc::new(SeriesCalculator::new(f, executor.clone())))
        .collect();
    let request = CalculationRequest {
        digits: Some(digits),
        ..CalculationRequest::default()
    };
    let results = execute_calculations(
        &calculators,
        &request,
        &CancellationToken::new(),
        &NullProgressReporter,
    );
    assert!(results.iter().all(|r| r.outcome.is_ok()), "failure at {digits} digits");
    analyze_comparison_results(&results).expect("formulas disagree");
});
