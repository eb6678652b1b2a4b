//! Statistical infrastructure for simulation analysis.
//!
//! This module provides the building blocks the decision layers are made of:
//! - [`StreamingStat`]: mergeable online accumulator of sample
//!   mean/variance/count, exact under any batch grouping
//! - [`PairedDifference`]: sampling distribution of the difference of two
//!   independently estimated means
//! - Standard-normal CDF and quantile, used to derive the one-sided
//!   confidence multiplier (`q95`) once per configuration

mod normal;
mod paired;
mod streaming;

pub use normal::{normal_cdf, normal_quantile};
pub use paired::PairedDifference;
pub use streaming::StreamingStat;
