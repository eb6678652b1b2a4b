//! Error taxonomy for statistical evaluation.
//!
//! Three situations look superficially similar but must stay distinct:
//! - [`StatError::InsufficientData`]: a statistic was queried from an empty
//!   sample. Signaled explicitly, because a silent zero would be
//!   indistinguishable from a genuinely zero-variance result.
//! - "Not applicable": an ability was never cast, a talent does not exist
//!   for the weapon setup. This is a typed skip (see
//!   [`crate::attribution::AttributionOutcome::Skipped`]), never an error.
//! - `Inconclusive`: a sequential comparison exhausted its batch schedule.
//!   A normal terminal outcome, carried on
//!   [`crate::sequential::ComparisonOutcome`].
//!
//! Errors are local-fatal: a failed statistic aborts the one candidate being
//! evaluated, not the whole sweep. No error is ever downgraded to a default
//! numeric value; NaN from the simulator propagates rather than being coerced
//! to zero, since a coerced zero would corrupt downstream interval arithmetic.

use thiserror::Error;

use crate::simulator::SimulatorError;

/// Failure to compute a statistic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatError {
    /// A mean-level statistic (standard error, variance of the mean) was
    /// requested from an accumulator with zero samples.
    #[error("statistic requested from an empty sample")]
    InsufficientData,
}

/// Failure to evaluate a single candidate, perturbation, or ablation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A statistic could not be computed from the accumulated samples.
    #[error(transparent)]
    Stat(#[from] StatError),

    /// The external simulator reported a failure.
    #[error("simulator failed: {0}")]
    Simulator(#[from] SimulatorError),
}
