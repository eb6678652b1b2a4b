//! # theorycraft
//!
//! Turn noisy combat-simulation output into confidence-bounded decisions.
//!
//! A combat simulator answers "what damage does this character deal?" with a
//! random draw. This crate answers the questions players actually ask:
//! - Is item B better than item A? ([`SequentialComparator`])
//! - How much DPS does one talent point buy? ([`weights::ComparativeWeightEngine`])
//! - How much damage does one resource unit buy? ([`attribution::CounterfactualAttributor`])
//!
//! The simulator itself is an external collaborator consumed through the
//! [`Simulator`] trait: given a configuration and a batch count, it returns a
//! [`SimulationReport`] with per-run damage statistics, a per-ability damage
//! breakdown, and a resource ledger. Everything statistical lives here.
//!
//! ## Quick Start
//!
//! ```
//! use theorycraft::{Engine, EngineConfig, Candidate};
//! use theorycraft::simulator::synthetic::{SyntheticProfile, SyntheticSimulator};
//!
//! let engine = Engine::new(EngineConfig::quick(), SyntheticSimulator::new(42, 60.0));
//!
//! let baseline = SyntheticProfile::new(1000.0, 50.0);
//! let base = engine.baseline(&baseline).unwrap();
//!
//! let sweep = engine.upgrade_sweep(
//!     base.dps(),
//!     &[Candidate::new("sharper sword", SyntheticProfile::new(1020.0, 50.0))],
//! );
//! for report in sweep.reports() {
//!     println!("{}: {:?}", report.name, report.outcome);
//! }
//! ```
//!
//! ## Statistical caveat
//!
//! The sequential test re-checks a one-sided confidence bound after every
//! batch. Data-dependent stopping of this kind inflates the false-positive
//! rate relative to a fixed-sample test; the asymmetric sample floors (see
//! [`sequential::DecisionFloors`]) are a heuristic mitigation, not a formally
//! corrected sequential procedure. Reported confidence levels should be read
//! with that in mind.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod engine;
mod error;

pub mod attribution;
pub mod sequential;
pub mod simulator;
pub mod statistics;
pub mod weights;

pub use config::EngineConfig;
pub use engine::{
    AttributionReport, Candidate, CandidateReport, Engine, SweepReport, WeightReport,
};
pub use error::{EvalError, StatError};
pub use sequential::{BatchSchedule, ComparisonOutcome, DecisionFloors, SequentialComparator};
pub use simulator::{
    AbilityId, DamageSource, ResourceLedger, SimulationReport, Simulator, SimulatorError,
};
pub use statistics::{PairedDifference, StreamingStat};
