//! Mergeable online statistics via Welford's algorithm.
//!
//! A [`StreamingStat`] accumulates mean, variance, and sample count for a
//! growing sample with O(1) memory. Batches computed independently (possibly
//! on other threads, possibly inside the simulator) combine with the pooled
//! formula: the merged mean weights each batch by its size, and the merged
//! spread accounts for both within-batch variance and the squared offset of
//! each batch mean from the pooled mean. Simple averaging of per-batch
//! statistics would be wrong whenever batch sizes differ.
//!
//! Variance here is the population variance of individual samples (divide by
//! `n`, not `n - 1`), which makes the merge exact and associative: merging
//! A then B then C yields the same result as any other grouping, up to
//! floating-point tolerance.

use serde::{Deserialize, Serialize};

use crate::error::StatError;

/// Online accumulator of sample mean, variance, and count.
///
/// Internally tracks Welford's `m2` (sum of squared deviations from the
/// running mean) rather than the variance itself, so both single-sample
/// updates and batch merges stay numerically stable and exact.
///
/// An empty accumulator reports a mean and variance of zero and carries zero
/// weight in merges; mean-level statistics ([`Self::std_of_mean`],
/// [`Self::var_of_mean`]) refuse to answer with
/// [`StatError::InsufficientData`] instead of returning a silent zero.
///
/// # Example
///
/// ```
/// use theorycraft::StreamingStat;
///
/// let mut dps = StreamingStat::new();
/// for x in [980.0, 1020.0, 1010.0, 990.0] {
///     dps.push(x);
/// }
/// assert!((dps.mean() - 1000.0).abs() < 1e-9);
/// assert_eq!(dps.count(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamingStat {
    mean: f64,
    /// Sum of squared deviations from the current mean (Welford's M2).
    m2: f64,
    count: u64,
}

impl StreamingStat {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct an accumulator from a batch summary `(mean, variance, count)`.
    ///
    /// `variance` is the population variance of the batch's individual
    /// samples. A zero `count` yields an empty accumulator regardless of the
    /// other arguments. This is the warm-start value a simulator may be
    /// handed alongside a batch request.
    pub fn from_batch(mean: f64, variance: f64, count: u64) -> Self {
        if count == 0 {
            return Self::new();
        }
        Self {
            mean,
            m2: variance * count as f64,
            count,
        }
    }

    /// Incorporate a single sample.
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Merge a batch of additional independent samples of the same quantity.
    ///
    /// Uses the pairwise Welford combination: exact, and associative and
    /// commutative over any grouping of batches. Merging an empty batch is a
    /// no-op; merging into an empty accumulator adopts the batch.
    pub fn merge(&mut self, batch: &StreamingStat) {
        if batch.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *batch;
            return;
        }
        let n0 = self.count as f64;
        let n1 = batch.count as f64;
        let n = n0 + n1;
        let delta = batch.mean - self.mean;
        self.m2 += batch.m2 + delta * delta * n0 * n1 / n;
        self.mean += delta * n1 / n;
        self.count += batch.count;
    }

    /// Sample mean, or `0.0` for an empty accumulator.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance of individual samples, or `0.0` when empty.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Number of samples accumulated.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Whether no samples have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Variance of the sample mean, `variance / count`.
    pub fn var_of_mean(&self) -> Result<f64, StatError> {
        if self.count == 0 {
            return Err(StatError::InsufficientData);
        }
        Ok(self.variance() / self.count as f64)
    }

    /// Standard error of the sample mean, `sqrt(variance / count)`.
    pub fn std_of_mean(&self) -> Result<f64, StatError> {
        Ok(self.var_of_mean()?.sqrt())
    }
}
