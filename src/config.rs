//! Engine configuration.

use crate::sequential::{BatchSchedule, DecisionFloors};
use crate::statistics::normal_quantile;

/// Configuration for the [`Engine`](crate::Engine).
///
/// All knobs have sensible defaults; presets ([`Self::quick`],
/// [`Self::thorough`]) adjust the sampling effort for common situations, and
/// builder methods tune individual fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    // =========================================================================
    // Decision thresholds
    // =========================================================================
    /// One-sided confidence level for every upgrade/downgrade decision.
    ///
    /// Default: 0.95.
    pub confidence: f64,

    /// Absolute tolerance when inverting the normal CDF for the confidence
    /// multiplier. Default: 1e-9.
    pub quantile_tolerance: f64,

    /// Samples required before committing to an upgrade. Default: 5,000.
    pub upgrade_floor: u64,

    /// Samples required before committing to a downgrade. Default: 500.
    ///
    /// Deliberately much smaller than `upgrade_floor`: a wrong downgrade
    /// keeps the current choice, a wrong upgrade changes a recommendation.
    pub downgrade_floor: u64,

    // =========================================================================
    // Sampling effort
    // =========================================================================
    /// First batch size of the sequential schedule. Default: 100.
    pub initial_batch: u32,

    /// Geometric growth factor between batches. Default: 1.2.
    pub batch_growth: f64,

    /// Number of batches in the schedule. Default: 26.
    pub schedule_steps: usize,

    /// Hard cap on candidate samples per comparison, regardless of the
    /// schedule. Default: 100,000.
    pub max_samples: u64,

    /// Batch size for the one-shot baseline estimate. Default: 10,000.
    pub baseline_batches: u32,

    /// Batch size per variant when computing stat and talent weights.
    /// Default: 10,000.
    pub weight_batches: u32,

    /// Batch size per ablation when attributing ability damage.
    /// Default: 10,000.
    pub attribution_batches: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            quantile_tolerance: 1e-9,
            upgrade_floor: 5_000,
            downgrade_floor: 500,
            initial_batch: 100,
            batch_growth: 1.2,
            schedule_steps: 26,
            max_samples: 100_000,
            baseline_batches: 10_000,
            weight_batches: 10_000,
            attribution_batches: 10_000,
        }
    }
}

impl EngineConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduced sampling effort for interactive exploration:
    /// - 2,000-sample upgrade floor
    /// - 20,000 sample cap per comparison
    /// - 2,000-sample weight, attribution, and baseline batches
    pub fn quick() -> Self {
        Self {
            upgrade_floor: 2_000,
            downgrade_floor: 200,
            max_samples: 20_000,
            baseline_batches: 2_000,
            weight_batches: 2_000,
            attribution_batches: 2_000,
            ..Default::default()
        }
    }

    /// Generous sampling effort for final recommendations:
    /// - 0.99 confidence
    /// - 1,000,000 sample cap per comparison
    /// - 50,000-sample weight, attribution, and baseline batches
    pub fn thorough() -> Self {
        Self {
            confidence: 0.99,
            upgrade_floor: 10_000,
            max_samples: 1_000_000,
            schedule_steps: 40,
            baseline_batches: 50_000,
            weight_batches: 50_000,
            attribution_batches: 50_000,
            ..Default::default()
        }
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Set the decision confidence level.
    pub fn confidence(mut self, confidence: f64) -> Self {
        assert!(
            confidence > 0.5 && confidence < 1.0,
            "confidence must be in (0.5, 1)"
        );
        self.confidence = confidence;
        self
    }

    /// Set the upgrade and downgrade sample floors.
    pub fn floors(mut self, upgrade: u64, downgrade: u64) -> Self {
        assert!(upgrade > 0, "upgrade floor must be positive");
        assert!(downgrade > 0, "downgrade floor must be positive");
        self.upgrade_floor = upgrade;
        self.downgrade_floor = downgrade;
        self
    }

    /// Set the sequential batch schedule parameters.
    pub fn schedule(mut self, initial: u32, growth: f64, steps: usize) -> Self {
        assert!(initial > 0, "initial batch size must be positive");
        assert!(growth >= 1.0, "growth factor must be at least 1");
        assert!(steps > 0, "schedule needs at least one step");
        self.initial_batch = initial;
        self.batch_growth = growth;
        self.schedule_steps = steps;
        self
    }

    /// Set the per-comparison sample cap.
    pub fn max_samples(mut self, max_samples: u64) -> Self {
        assert!(max_samples > 0, "sample cap must be positive");
        self.max_samples = max_samples;
        self
    }

    /// Set the fixed batch sizes for baseline, weight, and attribution runs.
    pub fn fixed_batches(mut self, baseline: u32, weights: u32, attribution: u32) -> Self {
        assert!(
            baseline > 0 && weights > 0 && attribution > 0,
            "fixed batch sizes must be positive"
        );
        self.baseline_batches = baseline;
        self.weight_batches = weights;
        self.attribution_batches = attribution;
        self
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    /// The one-sided confidence multiplier for `confidence`.
    pub fn confidence_multiplier(&self) -> f64 {
        normal_quantile(self.confidence, self.quantile_tolerance)
    }

    /// The batch schedule this configuration describes.
    pub fn batch_schedule(&self) -> BatchSchedule {
        BatchSchedule::geometric(self.initial_batch, self.batch_growth, self.schedule_steps)
    }

    /// The decision floors this configuration describes.
    pub fn decision_floors(&self) -> DecisionFloors {
        DecisionFloors {
            upgrade: self.upgrade_floor,
            downgrade: self.downgrade_floor,
        }
    }

    /// Validate cross-field consistency.
    ///
    /// Builder methods already reject out-of-range single fields; this checks
    /// relations between fields, returning a description of the first problem
    /// found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.confidence > 0.5 && self.confidence < 1.0) {
            return Err(format!(
                "confidence must be in (0.5, 1), got {}",
                self.confidence
            ));
        }
        if self.downgrade_floor > self.upgrade_floor {
            return Err(format!(
                "downgrade floor ({}) exceeds upgrade floor ({})",
                self.downgrade_floor, self.upgrade_floor
            ));
        }
        let schedule_total = self.batch_schedule().total_samples();
        if schedule_total <= self.upgrade_floor {
            return Err(format!(
                "schedule tops out at {schedule_total} samples, below the upgrade \
                 floor of {}; no upgrade could ever be declared",
                self.upgrade_floor
            ));
        }
        if self.max_samples <= self.upgrade_floor {
            return Err(format!(
                "sample cap ({}) is below the upgrade floor ({}); no upgrade \
                 could ever be declared",
                self.max_samples, self.upgrade_floor
            ));
        }
        Ok(())
    }
}
