//! Stat and talent weights by comparative simulation.
//!
//! A stat weight answers "how much DPS does one more point of this stat
//! buy?": perturb the configuration by a known amount of the stat, simulate
//! one large batch, and divide the DPS delta by the amount. Talent weights
//! work the same way except the two endpoints are the talent at zero points
//! and at maximum points, normalized by the points spanned.
//!
//! Weights are deliberately computed from one fixed-size batch per variant
//! rather than the sequential loop: the caller wants the magnitude with an
//! uncertainty, not an accept/reject decision, so there is no bound to stop
//! early on.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EvalError;
use crate::simulator::Simulator;
use crate::statistics::{PairedDifference, StreamingStat};

/// A candidate-producing perturbation of one stat.
///
/// `apply` builds the perturbed configuration, or `None` when the stat does
/// not apply to this configuration (a spell-power perturbation on a warrior,
/// say). Not-applicable is a typed skip, never an error.
pub struct StatPerturbation<C> {
    /// Display name of the stat.
    pub name: String,
    /// Magnitude of the perturbation, in the stat's own units. The measured
    /// DPS delta is divided by this to yield a per-unit weight.
    pub amount: f64,
    /// Build the perturbed configuration.
    pub apply: Box<dyn Fn(&C) -> Option<C> + Sync>,
}

impl<C> StatPerturbation<C> {
    /// Create a perturbation.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is not a positive finite number.
    pub fn new(
        name: impl Into<String>,
        amount: f64,
        apply: impl Fn(&C) -> Option<C> + Sync + 'static,
    ) -> Self {
        assert!(
            amount.is_finite() && amount > 0.0,
            "perturbation amount must be positive and finite"
        );
        Self {
            name: name.into(),
            amount,
            apply: Box::new(apply),
        }
    }
}

/// The two endpoint configurations of a talent span.
///
/// `None` on a side means the base configuration already sits at that bound,
/// so its simulation is reused rather than re-run.
pub struct TalentEndpoints<C> {
    /// Configuration with the talent at zero points, or `None` if the base
    /// already has it at zero.
    pub zeroed: Option<C>,
    /// Configuration with the talent at maximum points, or `None` if the base
    /// already has it maxed.
    pub maxed: Option<C>,
}

/// A candidate-producing span over one talent.
pub struct TalentSpan<C> {
    /// Display name of the talent.
    pub name: String,
    /// Points spanned between the zeroed and maxed endpoints.
    pub points: u32,
    /// Build the endpoint configurations, or `None` when the talent does not
    /// apply to this configuration.
    pub endpoints: Box<dyn Fn(&C) -> Option<TalentEndpoints<C>> + Sync>,
}

impl<C> TalentSpan<C> {
    /// Create a talent span.
    ///
    /// # Panics
    ///
    /// Panics if `points` is zero.
    pub fn new(
        name: impl Into<String>,
        points: u32,
        endpoints: impl Fn(&C) -> Option<TalentEndpoints<C>> + Sync + 'static,
    ) -> Self {
        assert!(points > 0, "talent span must cover at least one point");
        Self {
            name: name.into(),
            points,
            endpoints: Box::new(endpoints),
        }
    }
}

/// DPS bought by one unit of a stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatWeight {
    /// Display name of the stat.
    pub name: String,
    /// DPS per unit of the stat.
    pub per_unit: f64,
    /// Confidence half-width of `per_unit`.
    pub half_width: f64,
    /// Perturbation magnitude the weight was measured at, for display
    /// alongside the normalized value.
    pub amount: f64,
}

/// DPS bought by one talent point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalentWeight {
    /// Display name of the talent.
    pub name: String,
    /// DPS per talent point.
    pub per_point: f64,
    /// Confidence half-width of `per_point`.
    pub half_width: f64,
    /// Points spanned by the measurement.
    pub points: u32,
}

/// Result of one weight measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WeightOutcome<W> {
    /// The weight, with its uncertainty.
    Computed(W),
    /// The stat or talent does not apply to this configuration.
    Skipped {
        /// Display name of the skipped entry.
        name: String,
    },
}

impl<W> WeightOutcome<W> {
    /// The computed weight, if any.
    pub fn computed(&self) -> Option<&W> {
        match self {
            Self::Computed(w) => Some(w),
            Self::Skipped { .. } => None,
        }
    }
}

/// Computes stat and talent weights against a fixed base distribution.
pub struct ComparativeWeightEngine {
    batch_size: u32,
    q: f64,
}

impl ComparativeWeightEngine {
    /// Create a weight engine running `batch_size` trials per variant, with
    /// confidence multiplier `q` for the reported half-widths.
    pub fn new(batch_size: u32, q: f64) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        assert!(q > 0.0, "confidence multiplier must be positive");
        Self { batch_size, q }
    }

    /// Measure one stat weight.
    ///
    /// `base` is the finalized base DPS distribution; the perturbed variant
    /// gets one fresh batch, keeping the two sides independent.
    pub fn stat_weight<S: Simulator + ?Sized>(
        &self,
        simulator: &S,
        base_config: &S::Config,
        base: &StreamingStat,
        perturbation: &StatPerturbation<S::Config>,
    ) -> Result<WeightOutcome<StatWeight>, EvalError> {
        let Some(perturbed) = (perturbation.apply)(base_config) else {
            return Ok(WeightOutcome::Skipped {
                name: perturbation.name.clone(),
            });
        };
        let report = simulator.simulate(&perturbed, self.batch_size, None)?;
        let diff = PairedDifference::between(report.dps(), base, perturbation.amount)?;
        debug!(
            stat = %perturbation.name,
            per_unit = diff.mean_diff,
            "stat weight measured"
        );
        Ok(WeightOutcome::Computed(StatWeight {
            name: perturbation.name.clone(),
            per_unit: diff.mean_diff,
            half_width: diff.half_width(self.q),
            amount: perturbation.amount,
        }))
    }

    /// Measure one talent weight.
    ///
    /// Endpoint sides the base configuration already sits at reuse `base`
    /// instead of spending a fresh batch.
    pub fn talent_weight<S: Simulator + ?Sized>(
        &self,
        simulator: &S,
        base_config: &S::Config,
        base: &StreamingStat,
        span: &TalentSpan<S::Config>,
    ) -> Result<WeightOutcome<TalentWeight>, EvalError> {
        let Some(endpoints) = (span.endpoints)(base_config) else {
            return Ok(WeightOutcome::Skipped {
                name: span.name.clone(),
            });
        };
        // Both sides at bound would compare the base with itself.
        if endpoints.zeroed.is_none() && endpoints.maxed.is_none() {
            return Ok(WeightOutcome::Skipped {
                name: span.name.clone(),
            });
        }

        let zeroed = self.endpoint_stat(simulator, base, endpoints.zeroed.as_ref())?;
        let maxed = self.endpoint_stat(simulator, base, endpoints.maxed.as_ref())?;
        let diff = PairedDifference::between(&maxed, &zeroed, f64::from(span.points))?;
        debug!(
            talent = %span.name,
            per_point = diff.mean_diff,
            "talent weight measured"
        );
        Ok(WeightOutcome::Computed(TalentWeight {
            name: span.name.clone(),
            per_point: diff.mean_diff,
            half_width: diff.half_width(self.q),
            points: span.points,
        }))
    }

    fn endpoint_stat<S: Simulator + ?Sized>(
        &self,
        simulator: &S,
        base: &StreamingStat,
        endpoint: Option<&S::Config>,
    ) -> Result<StreamingStat, EvalError> {
        match endpoint {
            Some(config) => Ok(*simulator.simulate(config, self.batch_size, None)?.dps()),
            None => Ok(*base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::synthetic::{SyntheticProfile, SyntheticSimulator};

    const Q95: f64 = 1.6449;

    fn base_profile() -> SyntheticProfile {
        SyntheticProfile::new(1000.0, 50.0)
    }

    fn measured_base(sim: &SyntheticSimulator) -> StreamingStat {
        *sim.simulate(&base_profile(), 20_000, None).unwrap().dps()
    }

    #[test]
    fn stat_weight_normalizes_by_amount() {
        let sim = SyntheticSimulator::new(31, 60.0);
        let base = measured_base(&sim);
        let engine = ComparativeWeightEngine::new(20_000, Q95);

        // 2 DPS per point of attack power, measured through a +10 AP bump.
        let perturbation = StatPerturbation::new("attack power", 10.0, |p: &SyntheticProfile| {
            Some(SyntheticProfile::new(p.mean_dps + 20.0, p.std_dps))
        });

        let outcome = engine
            .stat_weight(&sim, &base_profile(), &base, &perturbation)
            .unwrap();
        let weight = outcome.computed().expect("should compute");
        assert!((weight.per_unit - 2.0).abs() < 0.25);
        assert!(weight.half_width > 0.0 && weight.half_width < 0.2);
        assert_eq!(weight.amount, 10.0);
    }

    #[test]
    fn inapplicable_stat_is_skipped() {
        let sim = SyntheticSimulator::new(37, 60.0);
        let base = measured_base(&sim);
        let engine = ComparativeWeightEngine::new(20_000, Q95);

        let perturbation =
            StatPerturbation::new("spell power", 10.0, |_: &SyntheticProfile| None);

        let outcome = engine
            .stat_weight(&sim, &base_profile(), &base, &perturbation)
            .unwrap();
        assert_eq!(
            outcome,
            WeightOutcome::Skipped {
                name: "spell power".into()
            }
        );
    }

    #[test]
    fn talent_weight_spans_zeroed_to_maxed() {
        let sim = SyntheticSimulator::new(41, 60.0);
        let base = measured_base(&sim);
        let engine = ComparativeWeightEngine::new(20_000, Q95);

        // 5 points worth 10 DPS each; the base sits mid-span so both
        // endpoints need their own batch.
        let span = TalentSpan::new("cruelty", 5, |p: &SyntheticProfile| {
            Some(TalentEndpoints {
                zeroed: Some(SyntheticProfile::new(p.mean_dps - 30.0, p.std_dps)),
                maxed: Some(SyntheticProfile::new(p.mean_dps + 20.0, p.std_dps)),
            })
        });

        let outcome = engine
            .talent_weight(&sim, &base_profile(), &base, &span)
            .unwrap();
        let weight = outcome.computed().expect("should compute");
        assert!((weight.per_point - 10.0).abs() < 0.5);
        assert_eq!(weight.points, 5);
    }

    #[test]
    fn maxed_talent_reuses_the_base_distribution() {
        let sim = SyntheticSimulator::new(43, 60.0);
        let base = measured_base(&sim);
        let engine = ComparativeWeightEngine::new(20_000, Q95);

        // Talent already at maximum in the base build: only the zeroed
        // endpoint is simulated, the maxed side is the base itself.
        let span = TalentSpan::new("improved whirlwind", 2, |p: &SyntheticProfile| {
            Some(TalentEndpoints {
                zeroed: Some(SyntheticProfile::new(p.mean_dps - 24.0, p.std_dps)),
                maxed: None,
            })
        });

        let outcome = engine
            .talent_weight(&sim, &base_profile(), &base, &span)
            .unwrap();
        let weight = outcome.computed().expect("should compute");
        assert!((weight.per_point - 12.0).abs() < 1.0);
    }

    #[test]
    fn at_bound_endpoint_spends_no_batch() {
        use std::cell::Cell;

        use crate::simulator::{AbilityId, SimulationReport, SimulatorError};

        struct CountingSimulator {
            calls: Cell<u32>,
        }

        impl Simulator for CountingSimulator {
            type Config = f64;

            fn simulate(
                &self,
                config: &f64,
                batch_size: u32,
                _warm_start: Option<&StreamingStat>,
            ) -> Result<SimulationReport, SimulatorError> {
                self.calls.set(self.calls.get() + 1);
                let dps = StreamingStat::from_batch(*config, 2500.0, u64::from(batch_size));
                Ok(SimulationReport::new(dps, 60.0))
            }

            fn simulate_ablated(
                &self,
                _config: &f64,
                _ability: &AbilityId,
                _batch_size: u32,
            ) -> Result<SimulationReport, SimulatorError> {
                Err(SimulatorError::new("not needed"))
            }
        }

        let sim = CountingSimulator { calls: Cell::new(0) };
        let base = StreamingStat::from_batch(1000.0, 2500.0, 10_000);
        let engine = ComparativeWeightEngine::new(10_000, Q95);

        let span = TalentSpan::new("two-handed spec", 3, |base_dps: &f64| {
            Some(TalentEndpoints {
                zeroed: Some(base_dps - 30.0),
                maxed: None,
            })
        });

        let outcome = engine.talent_weight(&sim, &1000.0, &base, &span).unwrap();
        // Only the zeroed endpoint simulates; the maxed side is the base.
        assert_eq!(sim.calls.get(), 1);
        let weight = outcome.computed().expect("should compute");
        assert!((weight.per_point - 10.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_span_is_skipped() {
        let sim = SyntheticSimulator::new(47, 60.0);
        let base = measured_base(&sim);
        let engine = ComparativeWeightEngine::new(1_000, Q95);

        let span = TalentSpan::new("flurry", 5, |_: &SyntheticProfile| {
            Some(TalentEndpoints {
                zeroed: None,
                maxed: None,
            })
        });

        let outcome = engine
            .talent_weight(&sim, &base_profile(), &base, &span)
            .unwrap();
        assert!(outcome.computed().is_none());
    }

    #[test]
    fn empty_base_is_an_error() {
        let sim = SyntheticSimulator::new(53, 60.0);
        let engine = ComparativeWeightEngine::new(1_000, Q95);
        let perturbation = StatPerturbation::new("attack power", 10.0, |p: &SyntheticProfile| {
            Some(SyntheticProfile::new(p.mean_dps + 20.0, p.std_dps))
        });

        let empty = StreamingStat::new();
        assert!(engine
            .stat_weight(&sim, &base_profile(), &empty, &perturbation)
            .is_err());
    }
}
