//! Per-record computation.
//!
//! Workers evaluate records through the [`Evaluate`] trait so the pool does not
//! depend on any particular function. [`FactorialService`] is the production
//! implementation: arbitrary-precision factorials backed by a dense table for
//! small arguments and a shared memo cache for everything above it.
//!
//! The memo cache is owned by the caller and passed in, so one cache lives for
//! exactly one pipeline run.

use std::sync::Arc;

use dashmap::DashMap;
use num_bigint::BigUint;
use num_traits::One;

use crate::errors::ComputeError;

/// Memoization table shared by all workers of a run.
pub type FactorialCache = DashMap<u64, Arc<BigUint>>;

/// A function evaluated once per valid record.
pub trait Evaluate: Send + Sync {
    /// Evaluates the function at `n`.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::InvalidInput`] when `n` is outside the domain.
    fn evaluate(&self, n: i64) -> Result<Arc<BigUint>, ComputeError>;
}

/// Memoized arbitrary-precision factorial.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use factpipe_lib::compute::{Evaluate, FactorialCache, FactorialService};
///
/// let service = FactorialService::new(20, Arc::new(FactorialCache::new()));
/// assert_eq!(service.evaluate(5).unwrap().to_string(), "120");
/// assert_eq!(
///     service.evaluate(25).unwrap().to_string(),
///     "15511210043330985984000000"
/// );
/// assert!(service.evaluate(-1).is_err());
/// ```
#[derive(Debug)]
pub struct FactorialService {
    /// `precomputed[i] == i!` for `i` in `0..=small_max`.
    precomputed: Vec<Arc<BigUint>>,
    cache: Arc<FactorialCache>,
}

impl FactorialService {
    /// Builds the dense table for `0..=small_max` sequentially.
    #[must_use]
    pub fn new(small_max: u32, cache: Arc<FactorialCache>) -> Self {
        let mut precomputed = Vec::with_capacity(small_max as usize + 1);
        let mut acc = BigUint::one();
        precomputed.push(Arc::new(acc.clone()));
        for i in 1..=small_max {
            acc *= i;
            precomputed.push(Arc::new(acc.clone()));
        }
        Self { precomputed, cache }
    }

    /// Largest argument served from the dense table.
    #[must_use]
    pub fn small_max(&self) -> u64 {
        (self.precomputed.len() - 1) as u64
    }

    /// Number of memoized values above the dense table.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Multiplies up from the top of the dense table.
    fn compute(&self, n: u64) -> BigUint {
        let start = self.small_max();
        let mut acc = self.precomputed[self.precomputed.len() - 1].as_ref().clone();
        for i in (start + 1)..=n {
            acc *= i;
        }
        acc
    }
}

impl Evaluate for FactorialService {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn evaluate(&self, n: i64) -> Result<Arc<BigUint>, ComputeError> {
        let n = u64::try_from(n).map_err(|_| ComputeError::InvalidInput(n))?;
        if n <= self.small_max() {
            return Ok(Arc::clone(&self.precomputed[n as usize]));
        }
        if let Some(hit) = self.cache.get(&n) {
            return Ok(Arc::clone(hit.value()));
        }
        // Computed outside any shard lock: concurrent callers may both compute,
        // but put-if-absent converges on the first stored value.
        let value = Arc::new(self.compute(n));
        Ok(Arc::clone(self.cache.entry(n).or_insert(value).value()))
    }
}
