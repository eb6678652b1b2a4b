//! Difference of two independently estimated means.

use serde::{Deserialize, Serialize};

use crate::error::StatError;
use crate::statistics::StreamingStat;

/// Sampling distribution of `(A.mean - B.mean) / divisor`.
///
/// `A` and `B` must come from statistically independent simulation runs:
/// the variances of their means simply add. Reusing correlated samples for
/// both sides understates or overstates the true uncertainty; this is a
/// caller precondition, not something this type can validate.
///
/// The divisor normalizes the delta into per-unit terms (talent points
/// spanned, size of a stat perturbation), which is how "stat weights" and
/// "per-point values" are produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairedDifference {
    /// Normalized difference of means, `(A.mean - B.mean) / divisor`.
    pub mean_diff: f64,
    /// Standard error of the normalized difference,
    /// `sqrt(A.var_of_mean + B.var_of_mean) / divisor`.
    pub std_of_mean_diff: f64,
}

impl PairedDifference {
    /// Compute the difference distribution of `a` minus `b`.
    ///
    /// # Panics
    ///
    /// Panics if `divisor` is not a positive finite number.
    pub fn between(
        a: &StreamingStat,
        b: &StreamingStat,
        divisor: f64,
    ) -> Result<Self, StatError> {
        assert!(
            divisor.is_finite() && divisor > 0.0,
            "normalization divisor must be positive and finite"
        );
        Ok(Self {
            mean_diff: (a.mean() - b.mean()) / divisor,
            std_of_mean_diff: (a.var_of_mean()? + b.var_of_mean()?).sqrt() / divisor,
        })
    }

    /// Confidence half-width at the given one-sided multiplier.
    pub fn half_width(&self, q: f64) -> f64 {
        q * self.std_of_mean_diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variances_of_the_mean_add_exactly() {
        let a = StreamingStat::from_batch(1000.0, 2500.0, 10_000);
        let b = StreamingStat::from_batch(980.0, 1600.0, 4_000);

        let diff = PairedDifference::between(&a, &b, 1.0).unwrap();

        assert!((diff.mean_diff - 20.0).abs() < 1e-10);
        let expected_var: f64 = 2500.0 / 10_000.0 + 1600.0 / 4_000.0;
        assert!((diff.std_of_mean_diff - expected_var.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn divisor_normalizes_both_moments() {
        let a = StreamingStat::from_batch(110.0, 100.0, 100);
        let b = StreamingStat::from_batch(100.0, 100.0, 100);

        let raw = PairedDifference::between(&a, &b, 1.0).unwrap();
        let per_point = PairedDifference::between(&a, &b, 5.0).unwrap();

        assert!((per_point.mean_diff - raw.mean_diff / 5.0).abs() < 1e-12);
        assert!((per_point.std_of_mean_diff - raw.std_of_mean_diff / 5.0).abs() < 1e-12);
    }

    #[test]
    fn half_width_scales_with_multiplier() {
        let a = StreamingStat::from_batch(10.0, 4.0, 400);
        let b = StreamingStat::from_batch(9.0, 4.0, 400);
        let diff = PairedDifference::between(&a, &b, 1.0).unwrap();
        assert!((diff.half_width(2.0) - 2.0 * diff.std_of_mean_diff).abs() < 1e-12);
    }

    #[test]
    fn empty_side_is_an_error() {
        let a = StreamingStat::from_batch(10.0, 4.0, 400);
        let empty = StreamingStat::new();
        assert_eq!(
            PairedDifference::between(&a, &empty, 1.0),
            Err(StatError::InsufficientData)
        );
    }
}
