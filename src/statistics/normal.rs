//! Standard-normal CDF and quantile.
//!
//! The decision layers need exactly one distributional constant: the
//! one-sided multiplier `q` such that `mean ± q * std_of_mean` brackets the
//! true mean at the configured confidence. It is derived once per
//! configuration by inverting the standard-normal CDF to a caller-chosen
//! tolerance, which keeps the hot comparison loop free of special-function
//! calls.

/// Complementary error function, rational approximation.
///
/// Absolute error below 1.2e-7 everywhere, which is orders of magnitude
/// tighter than the quantile tolerances used in practice.
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = t
        * (-z * z - 1.265_512_23
            + t * (1.000_023_68
                + t * (0.374_091_96
                    + t * (0.096_784_18
                        + t * (-0.186_288_06
                            + t * (0.278_868_07
                                + t * (-1.135_203_98
                                    + t * (1.488_515_87
                                        + t * (-0.822_152_23 + t * 0.170_872_77)))))))))
            .exp();
    if x >= 0.0 {
        poly
    } else {
        2.0 - poly
    }
}

/// Cumulative distribution function of the standard normal.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Invert the standard-normal CDF by bisection.
///
/// Returns `x` such that `normal_cdf(x)` is within `tolerance` of `p`, in the
/// sense that the bracketing interval has shrunk below `tolerance` in `x`.
///
/// # Panics
///
/// Panics if `p` is outside `(0, 1)` or `tolerance` is not positive.
pub fn normal_quantile(p: f64, tolerance: f64) -> f64 {
    assert!(p > 0.0 && p < 1.0, "quantile probability must be in (0, 1)");
    assert!(tolerance > 0.0, "tolerance must be positive");

    // The CDF saturates to within f64 resolution well inside +-8 sigma.
    let mut lo = -8.0_f64;
    let mut hi = 8.0_f64;
    while hi - lo > tolerance {
        let mid = 0.5 * (lo + hi);
        if normal_cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}
