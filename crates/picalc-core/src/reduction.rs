//! Balanced pairwise reduction of term tasks.

use tracing::debug;

use crate::decimal::Decimal;
use crate::precision::Precision;
use crate::progress::TermResult;
use crate::task::{Task, TaskScope};

/// Sums decimal tasks with a logarithmic-depth tree, rounding every
/// partial sum to a fixed precision.
#[derive(Debug, Clone, Copy)]
pub struct ReductionTree {
    precision: Precision,
}

impl ReductionTree {
    /// Tree rounding partial sums to `precision`.
    #[must_use]
    pub fn new(precision: Precision) -> Self {
        Self { precision }
    }

    /// Task resolving to the sum of `tasks`; zero when empty.
    ///
    /// # Example
    /// ```
    /// use picalc_core::decimal::Decimal;
    /// use picalc_core::precision::Precision;
    /// use picalc_core::reduction::ReductionTree;
    /// use picalc_core::task::{Executor, TaskScope};
    ///
    /// let scope = TaskScope::new(Executor::new(2).unwrap());
    /// let tasks = (1..=4u32).map(|i| scope.completed(Decimal::from(i))).collect();
    /// let sum = ReductionTree::new(Precision::default()).reduce(&scope, tasks);
    /// assert_eq!(sum.wait().unwrap(), Decimal::from(10u32));
    /// ```
    pub fn reduce(&self, scope: &TaskScope, tasks: Vec<Task<Decimal>>) -> Task<Decimal> {
        let precision = self.precision;
        reduce_balanced(scope, tasks, Decimal::zero(), move |a, b| {
            (&a + &b).round(precision)
        })
    }

    /// Task resolving to the sum of the term values.
    pub fn reduce_terms(&self, scope: &TaskScope, terms: Vec<Task<TermResult>>) -> Task<Decimal> {
        let values = terms.into_iter().map(|term| term.map(|term| term.value)).collect();
        self.reduce(scope, values)
    }
}

/// Combine adjacent tasks level by level until one remains.
///
/// Pairing is fixed by position: `(0,1), (2,3), ...`; an odd trailing
/// task is carried unchanged to the next level.
pub fn reduce_balanced<T, F>(scope: &TaskScope, tasks: Vec<Task<T>>, identity: T, combine: F) -> Task<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T, T) -> T + Clone + Send + 'static,
{
    if tasks.is_empty() {
        return scope.completed(identity);
    }

    let leaves = tasks.len();
    let mut level = tasks;
    let mut depth = 0u32;
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut iter = level.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => next.push(left.combine(&right, combine.clone())),
                None => next.push(left),
            }
        }
        level = next;
        depth += 1;
    }
    debug!(leaves, depth, "reduction tree built");

    level
        .into_iter()
        .next()
        .unwrap_or_else(|| scope.completed(identity))
}
