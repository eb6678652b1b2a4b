//! High-level orchestration: baseline, sweep, weights, attribution.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::attribution::{AblationRequest, AttributionOutcome, CounterfactualAttributor};
use crate::config::EngineConfig;
use crate::error::EvalError;
use crate::sequential::{ComparisonOutcome, SequentialComparator};
use crate::simulator::{AbilityId, SimulationReport, Simulator};
use crate::statistics::StreamingStat;
use crate::weights::{
    ComparativeWeightEngine, StatPerturbation, StatWeight, TalentSpan, TalentWeight,
    WeightOutcome,
};

/// One configuration to test against the baseline.
#[derive(Debug, Clone)]
pub struct Candidate<C> {
    /// Display name (item name, gear set label).
    pub name: String,
    /// The configuration to simulate.
    pub config: C,
    /// Static-comparison hint: the candidate's stats are near-equivalent to
    /// the current choice, so a measured downgrade should be annotated
    /// low-confidence.
    pub known_similar: bool,
}

impl<C> Candidate<C> {
    /// Create a candidate.
    pub fn new(name: impl Into<String>, config: C) -> Self {
        Self {
            name: name.into(),
            config,
            known_similar: false,
        }
    }

    /// Mark the candidate as statically near-equivalent to the current
    /// choice.
    pub fn known_similar(mut self) -> Self {
        self.known_similar = true;
        self
    }
}

/// Outcome of one candidate's sequential comparison.
///
/// A failed candidate (simulator error, empty baseline) carries its error
/// here instead of aborting the sweep; the other candidates are unaffected.
#[derive(Debug)]
pub struct CandidateReport {
    /// The candidate's display name.
    pub name: String,
    /// Classification, or the error that aborted this candidate.
    pub outcome: Result<ComparisonOutcome, EvalError>,
}

/// Outcome of one weight measurement, with the entry's display name.
///
/// Like [`CandidateReport`], a failed entry carries its error here; the
/// other entries in the batch are unaffected.
#[derive(Debug)]
pub struct WeightReport<W> {
    /// Display name of the stat or talent.
    pub name: String,
    /// The measured weight (or typed skip), or the error that aborted this
    /// entry.
    pub outcome: Result<WeightOutcome<W>, EvalError>,
}

/// Outcome of one ability attribution, with the ability's identity.
#[derive(Debug)]
pub struct AttributionReport {
    /// The ability requested.
    pub ability: AbilityId,
    /// The attribution (or typed skip), or the error that aborted this
    /// entry.
    pub outcome: Result<AttributionOutcome, EvalError>,
}

/// Results of a full upgrade sweep.
#[derive(Debug)]
pub struct SweepReport {
    reports: Vec<CandidateReport>,
}

impl SweepReport {
    /// Per-candidate reports, in input order.
    pub fn reports(&self) -> &[CandidateReport] {
        &self.reports
    }

    /// Names of candidates classified as upgrades, in input order.
    pub fn upgrades(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| matches!(&r.outcome, Ok(o) if o.is_upgrade()))
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Whether the current choice survived the sweep: no candidate was
    /// classified as an upgrade.
    pub fn is_best_in_slot(&self) -> bool {
        self.upgrades().is_empty()
    }
}

/// Ties the decision layers together around one simulator.
///
/// Owns the configuration, the simulator handle, and the confidence
/// multiplier (computed once at construction). Candidates within a sweep
/// evaluate in parallel; each candidate's own batches stay sequential.
#[derive(Debug)]
pub struct Engine<S> {
    config: EngineConfig,
    q: f64,
    simulator: S,
}

impl<S: Simulator> Engine<S> {
    /// Create an engine.
    ///
    /// # Panics
    ///
    /// Panics if the configuration fails [`EngineConfig::validate`].
    pub fn new(config: EngineConfig, simulator: S) -> Self {
        if let Err(message) = config.validate() {
            panic!("invalid engine configuration: {message}");
        }
        let q = config.confidence_multiplier();
        Self {
            config,
            q,
            simulator,
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying simulator.
    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    /// Establish the baseline: one large batch of the current configuration.
    ///
    /// The returned report anchors every subsequent comparison; its DPS
    /// distribution is the fixed reference the sweep, weights, and
    /// attribution all measure against.
    pub fn baseline(&self, config: &S::Config) -> Result<SimulationReport, EvalError> {
        let report = self
            .simulator
            .simulate(config, self.config.baseline_batches, None)?;
        report.dps().var_of_mean()?;
        info!(
            samples = report.dps().count(),
            mean = report.dps().mean(),
            "baseline established"
        );
        Ok(report)
    }

    /// Sequentially compare one candidate against the baseline.
    pub fn evaluate_candidate(
        &self,
        baseline: &StreamingStat,
        candidate: &Candidate<S::Config>,
    ) -> Result<ComparisonOutcome, EvalError> {
        let comparator = SequentialComparator::new(
            baseline,
            self.config.batch_schedule(),
            self.config.decision_floors(),
            self.q,
            self.config.max_samples,
        );
        comparator.evaluate(&self.simulator, &candidate.config, candidate.known_similar)
    }

    /// Measure stat weights against the base distribution, one fixed batch
    /// per applicable perturbation.
    ///
    /// Entry errors are carried in the individual [`WeightReport`]s; the
    /// remaining perturbations still get measured.
    pub fn stat_weights(
        &self,
        base_config: &S::Config,
        base: &StreamingStat,
        perturbations: &[StatPerturbation<S::Config>],
    ) -> Vec<WeightReport<StatWeight>> {
        let engine = ComparativeWeightEngine::new(self.config.weight_batches, self.q);
        perturbations
            .iter()
            .map(|p| WeightReport {
                name: p.name.clone(),
                outcome: engine.stat_weight(&self.simulator, base_config, base, p),
            })
            .collect()
    }

    /// Measure talent weights against the base distribution.
    ///
    /// Entry errors are carried in the individual [`WeightReport`]s; the
    /// remaining spans still get measured.
    pub fn talent_weights(
        &self,
        base_config: &S::Config,
        base: &StreamingStat,
        spans: &[TalentSpan<S::Config>],
    ) -> Vec<WeightReport<TalentWeight>> {
        let engine = ComparativeWeightEngine::new(self.config.weight_batches, self.q);
        spans
            .iter()
            .map(|s| WeightReport {
                name: s.name.clone(),
                outcome: engine.talent_weight(&self.simulator, base_config, base, s),
            })
            .collect()
    }

    /// Attribute per-cast and per-resource damage to abilities by
    /// counterfactual ablation.
    ///
    /// Entry errors are carried in the individual [`AttributionReport`]s;
    /// the remaining abilities still get attributed.
    pub fn attribute_abilities(
        &self,
        config: &S::Config,
        baseline: &SimulationReport,
        requests: &[AblationRequest],
    ) -> Vec<AttributionReport> {
        let attributor = CounterfactualAttributor::new(self.config.attribution_batches);
        requests
            .iter()
            .map(|r| AttributionReport {
                ability: r.ability.clone(),
                outcome: attributor.attribute(&self.simulator, config, baseline, r),
            })
            .collect()
    }
}

impl<S> Engine<S>
where
    S: Simulator + Sync,
    S::Config: Sync,
{
    /// Evaluate every candidate against the baseline, in parallel.
    ///
    /// Candidate errors are carried in the individual [`CandidateReport`]s;
    /// the sweep itself always completes.
    pub fn upgrade_sweep(
        &self,
        baseline: &StreamingStat,
        candidates: &[Candidate<S::Config>],
    ) -> SweepReport {
        info!(candidates = candidates.len(), "starting upgrade sweep");
        let reports = candidates
            .par_iter()
            .map(|candidate| {
                let outcome = self.evaluate_candidate(baseline, candidate);
                debug!(candidate = %candidate.name, ?outcome, "candidate evaluated");
                CandidateReport {
                    name: candidate.name.clone(),
                    outcome,
                }
            })
            .collect();
        SweepReport { reports }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::synthetic::{SyntheticProfile, SyntheticSimulator};

    fn engine() -> Engine<SyntheticSimulator> {
        Engine::new(EngineConfig::quick(), SyntheticSimulator::new(42, 60.0))
    }

    #[test]
    fn baseline_uses_the_configured_batch_size() {
        let engine = engine();
        let report = engine.baseline(&SyntheticProfile::new(1000.0, 50.0)).unwrap();
        assert_eq!(report.dps().count(), 2_000);
        assert!((report.dps().mean() - 1000.0).abs() < 6.0);
    }

    #[test]
    fn clear_upgrade_is_found_and_clear_downgrade_rejected() {
        let engine = engine();
        let base = engine.baseline(&SyntheticProfile::new(1000.0, 50.0)).unwrap();

        let sweep = engine.upgrade_sweep(
            base.dps(),
            &[
                Candidate::new("big upgrade", SyntheticProfile::new(1030.0, 50.0)),
                Candidate::new("clear downgrade", SyntheticProfile::new(960.0, 50.0)),
            ],
        );

        assert_eq!(sweep.upgrades(), vec!["big upgrade"]);
        assert!(!sweep.is_best_in_slot());
        assert_eq!(sweep.reports().len(), 2);
        assert!(matches!(
            sweep.reports()[1].outcome,
            Ok(ComparisonOutcome::Downgrade { .. })
        ));
    }

    #[test]
    fn best_in_slot_when_nothing_beats_the_baseline() {
        let engine = engine();
        let base = engine.baseline(&SyntheticProfile::new(1000.0, 50.0)).unwrap();

        let sweep = engine.upgrade_sweep(
            base.dps(),
            &[
                Candidate::new("worse", SyntheticProfile::new(970.0, 50.0)),
                Candidate::new("much worse", SyntheticProfile::new(940.0, 50.0)),
            ],
        );

        assert!(sweep.is_best_in_slot());
    }

    #[test]
    fn similar_candidate_downgrade_is_annotated() {
        let engine = engine();
        let base = engine.baseline(&SyntheticProfile::new(1000.0, 50.0)).unwrap();

        let candidate =
            Candidate::new("sidegrade", SyntheticProfile::new(960.0, 50.0)).known_similar();
        match engine.evaluate_candidate(base.dps(), &candidate).unwrap() {
            ComparisonOutcome::Downgrade { low_confidence, .. } => assert!(low_confidence),
            other => panic!("expected downgrade, got {other:?}"),
        }
    }

    #[test]
    fn sweeps_are_reproducible_per_seed() {
        let a = engine();
        let b = engine();
        let profile = SyntheticProfile::new(1000.0, 50.0);
        let base_a = a.baseline(&profile).unwrap();
        let base_b = b.baseline(&profile).unwrap();
        assert_eq!(base_a, base_b);

        let candidates =
            vec![Candidate::new("upgrade", SyntheticProfile::new(1030.0, 50.0))];
        let sweep_a = a.upgrade_sweep(base_a.dps(), &candidates);
        let sweep_b = b.upgrade_sweep(base_b.dps(), &candidates);
        match (&sweep_a.reports()[0].outcome, &sweep_b.reports()[0].outcome) {
            (Ok(x), Ok(y)) => assert_eq!(x, y),
            other => panic!("expected matching outcomes, got {other:?}"),
        }
    }

    #[test]
    fn failed_weight_entry_does_not_discard_the_others() {
        use crate::simulator::{SimulationReport, SimulatorError};
        use crate::statistics::StreamingStat;
        use crate::weights::StatPerturbation;

        // Fails on NaN configs, otherwise reports the config as the mean.
        struct FaultySimulator;

        impl Simulator for FaultySimulator {
            type Config = f64;

            fn simulate(
                &self,
                config: &f64,
                batch_size: u32,
                _warm_start: Option<&StreamingStat>,
            ) -> Result<SimulationReport, SimulatorError> {
                if config.is_nan() {
                    return Err(SimulatorError::new("rotation stalled"));
                }
                let dps = StreamingStat::from_batch(*config, 2500.0, u64::from(batch_size));
                Ok(SimulationReport::new(dps, 60.0))
            }

            fn simulate_ablated(
                &self,
                _config: &f64,
                _ability: &crate::simulator::AbilityId,
                _batch_size: u32,
            ) -> Result<SimulationReport, SimulatorError> {
                Err(SimulatorError::new("not needed"))
            }
        }

        let engine = Engine::new(EngineConfig::quick(), FaultySimulator);
        let base = StreamingStat::from_batch(1000.0, 2500.0, 10_000);

        let reports = engine.stat_weights(
            &1000.0,
            &base,
            &[
                StatPerturbation::new("attack power", 10.0, |base_dps: &f64| {
                    Some(base_dps + 20.0)
                }),
                StatPerturbation::new("haunted trinket", 10.0, |_: &f64| Some(f64::NAN)),
                StatPerturbation::new("crit rating", 10.0, |base_dps: &f64| {
                    Some(base_dps + 10.0)
                }),
            ],
        );

        assert_eq!(reports.len(), 3);
        let ap = reports[0].outcome.as_ref().unwrap().computed().unwrap();
        assert!((ap.per_unit - 2.0).abs() < 1e-9);
        assert_eq!(reports[1].name, "haunted trinket");
        assert!(reports[1].outcome.is_err());
        let crit = reports[2].outcome.as_ref().unwrap().computed().unwrap();
        assert!((crit.per_unit - 1.0).abs() < 1e-9);
    }

    #[test]
    fn failed_ablation_does_not_discard_the_others() {
        let engine = engine();
        let profile = SyntheticProfile::new(1000.0, 50.0)
            .with_ability("bloodthirst", 0.3, 20.0);
        let base = engine.baseline(&profile).unwrap();

        // "melee" appears in the baseline breakdown but is not ablatable,
        // so its entry fails while bloodthirst's still attributes.
        let reports = engine.attribute_abilities(
            &profile,
            &base,
            &[
                crate::attribution::AblationRequest::fixed_cost("bloodthirst", 30.0),
                crate::attribution::AblationRequest::fixed_cost("melee", 1.0),
            ],
        );

        assert_eq!(reports.len(), 2);
        assert!(reports[0].outcome.as_ref().unwrap().attribution().is_some());
        assert_eq!(reports[1].ability, "melee".into());
        assert!(reports[1].outcome.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid engine configuration")]
    fn invalid_configuration_is_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.downgrade_floor = config.upgrade_floor + 1;
        let _ = Engine::new(config, SyntheticSimulator::new(1, 60.0));
    }
}
