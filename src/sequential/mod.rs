//! Sequential comparison with early stopping.
//!
//! Deciding whether a candidate configuration beats a fixed baseline could be
//! done with one huge fixed-size sample, but most candidates are obviously
//! better or obviously worse and deserve neither the compute nor the wait.
//! The [`SequentialComparator`] instead runs progressively larger batches,
//! merges each into a running [`StreamingStat`], and re-tests a one-sided
//! confidence bound after every merge, stopping as soon as the evidence
//! clears an asymmetric sample floor.
//!
//! The floors are asymmetric on purpose: a false "upgrade" changes a
//! recommendation and is expensive, so upgrades demand a large floor
//! (default 5000 samples); a false "downgrade" merely fails to promote and is
//! cheap, so downgrades confirm sooner (default 500). Exhausting the schedule
//! without crossing either bound is [`ComparisonOutcome::Inconclusive`], a
//! normal terminal state that callers read as "no detectable difference, the
//! current choice stands".

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EvalError;
use crate::simulator::Simulator;
use crate::statistics::StreamingStat;

/// Increasing sequence of batch sizes for one sequential comparison.
///
/// Geometric growth keeps the total cost of a full (inconclusive) comparison
/// within a constant factor of its final batch, while still giving early
/// batches a chance to stop cheap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSchedule {
    initial: u32,
    growth: f64,
    steps: usize,
}

impl BatchSchedule {
    /// Geometric schedule: `steps` batches starting at `initial`, each the
    /// previous truncated times `growth`.
    ///
    /// # Panics
    ///
    /// Panics if `initial` is zero, `growth < 1`, or `steps` is zero.
    pub fn geometric(initial: u32, growth: f64, steps: usize) -> Self {
        assert!(initial > 0, "initial batch size must be positive");
        assert!(growth >= 1.0, "growth factor must be at least 1");
        assert!(steps > 0, "schedule needs at least one step");
        Self {
            initial,
            growth,
            steps,
        }
    }

    /// The batch sizes, in order.
    pub fn sizes(&self) -> Vec<u32> {
        let mut sizes = Vec::with_capacity(self.steps);
        let mut current = self.initial;
        for _ in 0..self.steps {
            sizes.push(current);
            current = (f64::from(current) * self.growth) as u32;
        }
        sizes
    }

    /// Total trials if every batch runs.
    pub fn total_samples(&self) -> u64 {
        self.sizes().iter().map(|&s| u64::from(s)).sum()
    }
}

impl Default for BatchSchedule {
    /// 26 batches growing from 100 by a factor of 1.2 (about 57k trials in
    /// total).
    fn default() -> Self {
        Self::geometric(100, 1.2, 26)
    }
}

/// Minimum sample counts required before committing to each outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionFloors {
    /// Samples required before an upgrade may be declared.
    pub upgrade: u64,
    /// Samples required before a downgrade may be declared.
    pub downgrade: u64,
}

impl Default for DecisionFloors {
    fn default() -> Self {
        Self {
            upgrade: 5000,
            downgrade: 500,
        }
    }
}

/// Terminal classification of one candidate against the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComparisonOutcome {
    /// The candidate's lower confidence bound cleared the baseline mean.
    Upgrade {
        /// `candidate.mean - baseline.mean`.
        delta_mean: f64,
        /// Standard error of the delta,
        /// `sqrt(candidate.var_of_mean + baseline.var_of_mean)`.
        delta_std: f64,
        /// Candidate samples consumed before stopping.
        samples: u64,
    },
    /// The candidate's upper confidence bound fell below the baseline mean.
    Downgrade {
        /// `candidate.mean - baseline.mean` (negative).
        delta_mean: f64,
        /// Standard error of the delta.
        delta_std: f64,
        /// Candidate samples consumed before stopping.
        samples: u64,
        /// Advisory flag: the candidate's static stats are near-equivalent
        /// to the current choice, so the measured downgrade is hard to trust.
        /// Never changes the classification itself.
        low_confidence: bool,
    },
    /// Neither bound was crossed before the schedule (or sample cap) ran out.
    Inconclusive {
        /// Candidate samples consumed.
        samples: u64,
    },
}

impl ComparisonOutcome {
    /// Whether the candidate was classified as an upgrade.
    pub fn is_upgrade(&self) -> bool {
        matches!(self, Self::Upgrade { .. })
    }

    /// Whether either bound was crossed.
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, Self::Inconclusive { .. })
    }

    /// The measured mean delta, if conclusive.
    pub fn delta_mean(&self) -> Option<f64> {
        match self {
            Self::Upgrade { delta_mean, .. } | Self::Downgrade { delta_mean, .. } => {
                Some(*delta_mean)
            }
            Self::Inconclusive { .. } => None,
        }
    }

    /// Candidate samples consumed.
    pub fn samples(&self) -> u64 {
        match self {
            Self::Upgrade { samples, .. }
            | Self::Downgrade { samples, .. }
            | Self::Inconclusive { samples } => *samples,
        }
    }
}

/// Sequential tester for one candidate against a finalized baseline.
///
/// The baseline is read-only for the whole comparison and safe to share
/// across concurrently evaluated candidates; the running candidate statistics
/// are owned by this comparator's loop, so the batches of one candidate are
/// strictly ordered while distinct candidates parallelize freely.
#[derive(Debug, Clone)]
pub struct SequentialComparator<'a> {
    baseline: &'a StreamingStat,
    schedule: BatchSchedule,
    floors: DecisionFloors,
    q: f64,
    max_samples: u64,
}

impl<'a> SequentialComparator<'a> {
    /// Create a comparator.
    ///
    /// `q` is the one-sided confidence multiplier (see
    /// [`crate::statistics::normal_quantile`]); `max_samples` is a hard cap
    /// on candidate trials regardless of the schedule.
    pub fn new(
        baseline: &'a StreamingStat,
        schedule: BatchSchedule,
        floors: DecisionFloors,
        q: f64,
        max_samples: u64,
    ) -> Self {
        assert!(q > 0.0, "confidence multiplier must be positive");
        Self {
            baseline,
            schedule,
            floors,
            q,
            max_samples,
        }
    }

    /// Run the sequential comparison for `config`.
    ///
    /// `known_similar` is the external static-comparison hint: when set, a
    /// downgrade is annotated low-confidence (the tag itself is unaffected).
    ///
    /// Returns an error if the baseline is empty or the simulator fails;
    /// either aborts only this candidate.
    pub fn evaluate<S: Simulator + ?Sized>(
        &self,
        simulator: &S,
        config: &S::Config,
        known_similar: bool,
    ) -> Result<ComparisonOutcome, EvalError> {
        let baseline_var_of_mean = self.baseline.var_of_mean()?;
        let baseline_mean = self.baseline.mean();

        let mut candidate = StreamingStat::new();
        for batch_size in self.schedule.sizes() {
            if candidate.count() >= self.max_samples {
                break;
            }
            let report = simulator.simulate(config, batch_size, Some(&candidate))?;
            candidate.merge(report.dps());

            let std_of_mean = candidate.std_of_mean()?;
            let mean = candidate.mean();
            debug!(
                samples = candidate.count(),
                mean,
                std_of_mean,
                baseline = baseline_mean,
                "merged batch"
            );

            if mean - self.q * std_of_mean >= baseline_mean
                && candidate.count() > self.floors.upgrade
            {
                return Ok(ComparisonOutcome::Upgrade {
                    delta_mean: mean - baseline_mean,
                    delta_std: (candidate.var_of_mean()? + baseline_var_of_mean).sqrt(),
                    samples: candidate.count(),
                });
            }

            if mean + self.q * std_of_mean <= baseline_mean
                && candidate.count() > self.floors.downgrade
            {
                return Ok(ComparisonOutcome::Downgrade {
                    delta_mean: mean - baseline_mean,
                    delta_std: (candidate.var_of_mean()? + baseline_var_of_mean).sqrt(),
                    samples: candidate.count(),
                    low_confidence: known_similar,
                });
            }
        }

        Ok(ComparisonOutcome::Inconclusive {
            samples: candidate.count(),
        })
    }
}
