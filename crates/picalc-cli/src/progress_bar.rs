//! Terminal progress bars fed by series events.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use picalc_core::formula::Formula;
use picalc_core::observer::ProgressListener;
use picalc_core::progress::ProgressEvent;

const TEMPLATE: &str = "{prefix:>12.cyan.bold} [{bar:40.green/white}] {pos}/{len} terms ({elapsed})";

/// Listener advancing a bar by one per completed term.
pub struct ProgressBarListener {
    bar: ProgressBar,
}

impl ProgressBarListener {
    /// Bar of `terms` steps labelled with the formula name, attached to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, formula: Formula, terms: u64) -> Self {
        let bar = multi.add(ProgressBar::new(terms));
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(formula.name());
        Self { bar }
    }

    /// Bar that never draws.
    #[must_use]
    pub fn hidden(terms: u64) -> Self {
        Self {
            bar: ProgressBar::with_draw_target(Some(terms), ProgressDrawTarget::hidden()),
        }
    }

    /// Underlying bar.
    #[must_use]
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    /// Stop drawing, leaving the final state on screen.
    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl ProgressListener for ProgressBarListener {
    fn on_event(&self, event: &ProgressEvent) {
        if let ProgressEvent::IterationCompleted { .. } = event {
            self.bar.inc(1);
        }
    }
}
