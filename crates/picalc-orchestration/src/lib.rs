//! # picalc-orchestration
//!
//! Calculator selection, bounded execution, and cross-formula validation.

pub mod calculator_selection;
pub mod interfaces;
pub mod orchestrator;

pub use interfaces::{CalculationResult, ProgressReporter, ResultPresenter};
pub use orchestrator::{analyze_comparison_results, execute_calculations, CalculationRequest};
