//! Calculator selection logic.

use std::sync::Arc;

use picalc_core::calculator::{SeriesCalculator, SeriesError};
use picalc_core::registry::CalculatorFactory;

/// Calculators to run for a formula selection: `"all"` or one formula name.
pub fn get_calculators_to_run(
    formula: &str,
    factory: &dyn CalculatorFactory,
) -> Result<Vec<Arc<SeriesCalculator>>, SeriesError> {
    if formula.eq_ignore_ascii_case("all") {
        return factory
            .available()
            .into_iter()
            .map(|name| factory.get(name))
            .collect();
    }
    Ok(vec![factory.get(formula)?])
}
