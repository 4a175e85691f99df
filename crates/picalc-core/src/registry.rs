//! Calculator factory and registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::calculator::{SeriesCalculator, SeriesError};
use crate::formula::Formula;
use crate::task::Executor;

/// Factory trait for obtaining calculators by formula name.
pub trait CalculatorFactory: Send + Sync {
    /// Get or create the calculator for `name`.
    fn get(&self, name: &str) -> Result<Arc<SeriesCalculator>, SeriesError>;

    /// Names of all available formulas.
    fn available(&self) -> Vec<&'static str>;
}

/// Default factory: one lazily created calculator per formula, all sharing
/// the same executor.
pub struct DefaultFactory {
    executor: Executor,
    cache: RwLock<HashMap<Formula, Arc<SeriesCalculator>>>,
}

impl DefaultFactory {
    /// Create a factory whose calculators run on `executor`.
    #[must_use]
    pub fn new(executor: Executor) -> Self {
        Self {
            executor,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Executor handed to new calculators.
    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }
}

impl CalculatorFactory for DefaultFactory {
    fn get(&self, name: &str) -> Result<Arc<SeriesCalculator>, SeriesError> {
        let formula: Formula = name.parse()?;
        if let Some(calc) = self.cache.read().get(&formula) {
            return Ok(Arc::clone(calc));
        }

        let mut cache = self.cache.write();
        let calc = cache
            .entry(formula)
            .or_insert_with(|| Arc::new(SeriesCalculator::new(formula, self.executor.clone())));
        Ok(Arc::clone(calc))
    }

    fn available(&self) -> Vec<&'static str> {
        Formula::ALL.iter().map(|f| f.name()).collect()
    }
}
