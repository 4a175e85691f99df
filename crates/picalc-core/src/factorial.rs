//! Memoizing factorial provider shared by concurrently running term tasks.

use std::collections::BTreeMap;
use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::One;
use parking_lot::RwLock;
use tracing::trace;

use crate::calculator::{to_index, SeriesError};

/// Thread-safe, monotonically growing cache of `n!`.
///
/// Lookups continue from the largest cached factorial below `n`, so a
/// series that requests `0!, 1!, 2!, ...` multiplies each step once.
/// Two callers racing on the same `n` may both compute it; the first
/// insert wins and both observe equal values.
pub struct FactorialCache {
    cache: RwLock<BTreeMap<u32, Arc<BigUint>>>,
}

impl FactorialCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// `n!` for a caller-supplied integer. Negative `n` is rejected.
    ///
    /// # Example
    /// ```
    /// use picalc_core::factorial::FactorialCache;
    ///
    /// let cache = FactorialCache::new();
    /// assert_eq!(cache.factorial(5).unwrap().to_string(), "120");
    /// assert!(cache.factorial(-1).is_err());
    /// ```
    pub fn factorial(&self, n: i64) -> Result<BigUint, SeriesError> {
        let n = to_index(n, "factorial argument")?;
        Ok(self.get(n).as_ref().clone())
    }

    /// Shared `n!`, computing and caching it if absent.
    pub fn get(&self, n: u32) -> Arc<BigUint> {
        if n <= 1 {
            return Arc::new(BigUint::one());
        }

        let (start, mut acc) = {
            let cache = self.cache.read();
            if let Some(value) = cache.get(&n) {
                return Arc::clone(value);
            }
            match cache.range(..n).next_back() {
                Some((&m, value)) => (m, value.as_ref().clone()),
                None => (1, BigUint::one()),
            }
        };

        trace!(n, from = start, "computing factorial");
        for i in start + 1..=n {
            acc *= i;
        }

        let mut cache = self.cache.write();
        Arc::clone(cache.entry(n).or_insert_with(|| Arc::new(acc)))
    }

    /// Whether `n!` is already cached.
    #[must_use]
    pub fn contains(&self, n: u32) -> bool {
        self.cache.read().contains_key(&n)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

impl Default for FactorialCache {
    fn default() -> Self {
        Self::new()
    }
}
