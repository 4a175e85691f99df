//! # picalc-cli
//!
//! CLI output, progress bars, JSON reports, and shell completion.

pub mod completion;
pub mod output;
pub mod presenter;
pub mod progress_bar;
pub mod ui;

pub use presenter::{CLIProgressReporter, CLIResultPresenter};
