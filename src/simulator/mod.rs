//! The external simulator contract.
//!
//! The combat mechanics themselves (rotation logic, hit tables, buff timers,
//! damage formulas) live outside this crate. A [`Simulator`] is consumed
//! purely through this contract: given a character configuration and a batch
//! count, produce a [`SimulationReport`] over that many independent,
//! identically distributed runs.
//!
//! Two requirements on implementations matter for correctness:
//! - runs within and across calls are independent for a fixed configuration
//!   (deterministic given a seed is fine);
//! - ablation ([`Simulator::simulate_ablated`]) suppresses an ability's
//!   damage while leaving its cast decisions and resource expenditure
//!   unchanged. If ability selection feeds back on the ability's own damage
//!   output (an execute-phase threshold keyed on cumulative damage, say),
//!   ablation shifts cast counts too and attribution is biased; validate
//!   this against the real simulator rather than assuming it.

pub mod synthetic;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::statistics::StreamingStat;

/// Name of a damage source (an ability, or the auto-attack stream).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AbilityId(String);

impl AbilityId {
    /// Create an ability identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The ability's name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AbilityId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Damage and cast count attributed to one named source, summed over a batch.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageSource {
    /// Total damage dealt by this source across all runs in the batch.
    pub damage: f64,
    /// Total casts (or swings) of this source across all runs in the batch.
    pub count: u64,
}

/// Resource units lost to mechanics rather than spent on abilities,
/// aggregated over a batch. Auxiliary reporting only; the decision logic
/// never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceLedger {
    /// Resource generated while already at cap and therefore wasted.
    pub lost_to_cap: f64,
    /// Resource forfeited by configuration switches (stance dancing and the
    /// like) during the run.
    pub lost_to_swap: f64,
}

impl ResourceLedger {
    /// Average resource lost to cap-overflow per run, `0.0` for an empty
    /// batch.
    pub fn avg_lost_to_cap(&self, runs: u64) -> f64 {
        if runs == 0 {
            0.0
        } else {
            self.lost_to_cap / runs as f64
        }
    }

    /// Average resource lost to configuration switches per run, `0.0` for an
    /// empty batch.
    pub fn avg_lost_to_swap(&self, runs: u64) -> f64 {
        if runs == 0 {
            0.0
        } else {
            self.lost_to_swap / runs as f64
        }
    }
}

/// Summary of one simulation batch.
///
/// Carries the per-run DPS distribution, the per-source damage breakdown,
/// and the resource ledger. The breakdown must satisfy the invariant that
/// named sources sum to total damage; [`Self::verify_sources`] checks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    dps: StreamingStat,
    sources: HashMap<AbilityId, DamageSource>,
    resource_ledger: ResourceLedger,
    sim_time: f64,
}

impl SimulationReport {
    /// Build a report from a per-run DPS distribution and the fight length
    /// (seconds per run).
    pub fn new(dps: StreamingStat, sim_time: f64) -> Self {
        Self {
            dps,
            sources: HashMap::new(),
            resource_ledger: ResourceLedger::default(),
            sim_time,
        }
    }

    /// Attach a damage source to the breakdown.
    pub fn with_source(mut self, id: impl Into<AbilityId>, source: DamageSource) -> Self {
        self.sources.insert(id.into(), source);
        self
    }

    /// Attach the resource ledger.
    pub fn with_resource_ledger(mut self, ledger: ResourceLedger) -> Self {
        self.resource_ledger = ledger;
        self
    }

    /// Per-run DPS distribution over the batch.
    pub fn dps(&self) -> &StreamingStat {
        &self.dps
    }

    /// Damage breakdown by named source.
    pub fn sources(&self) -> &HashMap<AbilityId, DamageSource> {
        &self.sources
    }

    /// Look up one damage source.
    pub fn source(&self, id: &AbilityId) -> Option<&DamageSource> {
        self.sources.get(id)
    }

    /// Resource ledger aggregated over the batch.
    pub fn resource_ledger(&self) -> &ResourceLedger {
        &self.resource_ledger
    }

    /// Fight length in seconds per run.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Average casts of `id` per run, `0.0` if the source never appears.
    pub fn avg_casts(&self, id: &AbilityId) -> f64 {
        match self.sources.get(id) {
            Some(source) if self.dps.count() > 0 => {
                source.count as f64 / self.dps.count() as f64
            }
            _ => 0.0,
        }
    }

    /// Check that named sources sum to total damage within `tolerance`
    /// (relative).
    ///
    /// Total damage over the batch is `dps.mean() * sim_time * runs`. A
    /// violation means the simulator dropped or double-counted a source;
    /// it is reported, never silently repaired.
    pub fn verify_sources(&self, tolerance: f64) -> Result<(), SimulatorError> {
        let total = self.dps.mean() * self.sim_time * self.dps.count() as f64;
        let summed: f64 = self.sources.values().map(|s| s.damage).sum();
        let scale = total.abs().max(1.0);
        if (summed - total).abs() > tolerance * scale {
            return Err(SimulatorError::new(format!(
                "damage sources sum to {summed:.3} but total damage is {total:.3}"
            )));
        }
        Ok(())
    }
}

/// Error reported by a simulator implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SimulatorError {
    message: String,
}

impl SimulatorError {
    /// Create an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Contract for the external combat simulator.
///
/// `Config` is the (opaque, immutable) character configuration. The decision
/// layers clone and perturb configurations and pass each one by reference
/// into `simulate`; nothing here mutates shared simulator state between runs,
/// so independent candidates may call into the same simulator concurrently.
pub trait Simulator {
    /// Character configuration type.
    type Config;

    /// Run `batch_size` independent trials of `config`.
    ///
    /// `warm_start` carries the statistics accumulated over earlier batches
    /// of the same comparison. It is advisory: the sequential layer merges
    /// batches externally, so an implementation may ignore it entirely, or
    /// use it to skip redundant recomputation.
    fn simulate(
        &self,
        config: &Self::Config,
        batch_size: u32,
        warm_start: Option<&StreamingStat>,
    ) -> Result<SimulationReport, SimulatorError>;

    /// Run `batch_size` trials with `ability`'s damage suppressed.
    ///
    /// Cast decisions and resource expenditure for the ability must proceed
    /// unchanged; only its damage contribution is zeroed. See the module
    /// documentation for the feedback caveat.
    fn simulate_ablated(
        &self,
        config: &Self::Config,
        ability: &AbilityId,
        batch_size: u32,
    ) -> Result<SimulationReport, SimulatorError>;
}
