//! Counterfactual ablation: what is one ability actually worth?
//!
//! Per-source damage totals overstate an ability's value, because casting it
//! spends resource and global cooldown time that the rotation would otherwise
//! put elsewhere. The counterfactual instead re-runs the simulation with the
//! ability's damage suppressed but its cast decisions and resource costs
//! intact; the DPS drop is the ability's true marginal contribution, and
//! dividing by measured casts and resource cost yields damage-per-cast and
//! damage-per-resource-unit.
//!
//! Each ability gets its own independent ablation run; attributions share
//! nothing beyond the common baseline report.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EvalError;
use crate::simulator::{AbilityId, SimulationReport, Simulator};

/// Marginal value of one ability, from its counterfactual run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    /// The ability evaluated.
    pub ability: AbilityId,
    /// Damage attributed to one cast.
    pub damage_per_cast: f64,
    /// Effective resource cost of one cast, as supplied by the cost model.
    pub resource_cost_per_cast: f64,
    /// Damage bought by one resource unit.
    pub damage_per_resource: f64,
}

/// Result of an attribution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributionOutcome {
    /// Attribution computed.
    Attributed(Attribution),
    /// The ability does not apply to this run; absence of a result, not a
    /// failure.
    Skipped {
        /// The ability requested.
        ability: AbilityId,
        /// Why it was skipped.
        reason: SkipReason,
    },
}

impl AttributionOutcome {
    /// The attribution, if one was computed.
    pub fn attribution(&self) -> Option<&Attribution> {
        match self {
            Self::Attributed(a) => Some(a),
            Self::Skipped { .. } => None,
        }
    }
}

/// Why an attribution was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The ability averaged fewer than one cast per baseline run, so
    /// per-cast figures would divide by (nearly) zero.
    RarelyCast,
    /// The supplied resource cost was zero or negative; damage-per-resource
    /// is undefined.
    NoResourceCost,
}

/// Pure attribution arithmetic over two finished reports.
///
/// `resource_cost_per_cast` is supplied by the caller: resource costs often
/// depend on auxiliary quantities measured in the baseline (incidental
/// resource losses overlapping the ability's timing window) and are never
/// recomputed here.
pub fn attribute_ability(
    baseline: &SimulationReport,
    ablated: &SimulationReport,
    ability: &AbilityId,
    resource_cost_per_cast: f64,
) -> Result<AttributionOutcome, EvalError> {
    // Errors (no baseline sample at all) stay errors; a rarely-cast ability
    // is an expected skip.
    baseline.dps().var_of_mean()?;

    let avg_casts = baseline.avg_casts(ability);
    if avg_casts < 1.0 {
        return Ok(AttributionOutcome::Skipped {
            ability: ability.clone(),
            reason: SkipReason::RarelyCast,
        });
    }
    if resource_cost_per_cast <= 0.0 {
        return Ok(AttributionOutcome::Skipped {
            ability: ability.clone(),
            reason: SkipReason::NoResourceCost,
        });
    }

    let delta_dps = baseline.dps().mean() - ablated.dps().mean();
    let total_attributed = delta_dps * baseline.sim_time();
    let damage_per_cast = total_attributed / avg_casts;
    let damage_per_resource = damage_per_cast / resource_cost_per_cast;

    Ok(AttributionOutcome::Attributed(Attribution {
        ability: ability.clone(),
        damage_per_cast,
        resource_cost_per_cast,
        damage_per_resource,
    }))
}

/// A cost model evaluated against the baseline report.
pub type ResourceCostModel = Box<dyn Fn(&SimulationReport) -> f64 + Sync>;

/// One attribution request: an ability and its resource cost model.
pub struct AblationRequest {
    /// The ability to ablate.
    pub ability: AbilityId,
    /// Resource cost per cast, derived from the baseline report (fixed costs
    /// simply ignore their argument).
    pub resource_cost: ResourceCostModel,
}

impl AblationRequest {
    /// Request with a cost model reading the baseline report.
    pub fn new(
        ability: impl Into<AbilityId>,
        resource_cost: impl Fn(&SimulationReport) -> f64 + Sync + 'static,
    ) -> Self {
        Self {
            ability: ability.into(),
            resource_cost: Box::new(resource_cost),
        }
    }

    /// Request with a fixed resource cost per cast.
    pub fn fixed_cost(ability: impl Into<AbilityId>, cost: f64) -> Self {
        Self::new(ability, move |_| cost)
    }
}

/// Drives one counterfactual run per requested ability.
#[derive(Debug, Clone, Copy)]
pub struct CounterfactualAttributor {
    batch_size: u32,
}

impl CounterfactualAttributor {
    /// Create an attributor running `batch_size` trials per ablation.
    pub fn new(batch_size: u32) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        Self { batch_size }
    }

    /// Ablate one ability and attribute its damage.
    ///
    /// The ablation simulation is skipped entirely when the baseline already
    /// rules the ability out (rarely cast, or zero cost).
    pub fn attribute<S: Simulator + ?Sized>(
        &self,
        simulator: &S,
        config: &S::Config,
        baseline: &SimulationReport,
        request: &AblationRequest,
    ) -> Result<AttributionOutcome, EvalError> {
        baseline.dps().var_of_mean()?;

        let avg_casts = baseline.avg_casts(&request.ability);
        if avg_casts < 1.0 {
            return Ok(AttributionOutcome::Skipped {
                ability: request.ability.clone(),
                reason: SkipReason::RarelyCast,
            });
        }
        let resource_cost = (request.resource_cost)(baseline);
        if resource_cost <= 0.0 {
            return Ok(AttributionOutcome::Skipped {
                ability: request.ability.clone(),
                reason: SkipReason::NoResourceCost,
            });
        }

        let ablated = simulator.simulate_ablated(config, &request.ability, self.batch_size)?;
        debug!(
            ability = %request.ability,
            baseline_dps = baseline.dps().mean(),
            ablated_dps = ablated.dps().mean(),
            "ablation complete"
        );
        attribute_ability(baseline, &ablated, &request.ability, resource_cost)
    }
}
