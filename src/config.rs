//! Tunable detection constants.
//!
//! The numeric thresholds that drive pattern detection and scoring are
//! behavioral constants of the engine, not incidental magic numbers scattered
//! through the pipeline. They are gathered here, in the style of the
//! teacher's `ValidatorConfig`/`FraudThresholds`/`AMLThresholds` structs, so
//! a caller can see (and in tests, override) every knob in one place.
//!
//! [`DetectionConfig::default`] reproduces the fixed values fraud detection
//! spec requires; there is no supported way to make `analyze` behave
//! differently from these defaults except by constructing a custom
//! `DetectionConfig` for testing.

use std::collections::HashMap;

use crate::patterns::Tag;

/// Base suspicion points awarded per detected pattern tag.
#[derive(Debug, Clone)]
pub struct PatternWeights {
    weights: HashMap<Tag, f64>,
    default_weight: f64,
}

impl PatternWeights {
    pub fn score_for(&self, tag: Tag) -> f64 {
        self.weights.get(&tag).copied().unwrap_or(self.default_weight)
    }
}

impl Default for PatternWeights {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert(Tag::CycleLength3, 35.0);
        weights.insert(Tag::CycleLength4, 30.0);
        weights.insert(Tag::CycleLength5, 25.0);
        weights.insert(Tag::FanIn, 30.0);
        weights.insert(Tag::FanOut, 30.0);
        weights.insert(Tag::LayeredShell, 25.0);
        Self {
            weights,
            default_weight: 10.0,
        }
    }
}

/// All tunable constants of the detection-and-scoring pipeline.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Minimum final suspicion score (0-100) for an account to be flagged.
    pub suspicion_threshold: f64,
    /// Base points per pattern tag (spec.md table, §4.3 step 1).
    pub pattern_weights: PatternWeights,
    /// Velocity (txns/day) above which the `high_velocity` bonus applies.
    pub velocity_cutoff: f64,
    /// Average-amount ceiling below which the `small_amounts` bonus applies.
    pub small_amount_cutoff: f64,
    /// `[low, high]` betweenness tiers controlling the 8.0 / 15.0 bonus.
    pub betweenness_tiers: [f64; 2],
    /// PageRank threshold above which the `high_pagerank` bonus applies.
    pub pagerank_cutoff: f64,
    /// Additive suspicion reduction for merchant-like accounts.
    pub merchant_reduction: f64,
    /// Additive suspicion reduction for payroll-like accounts.
    pub payroll_reduction: f64,
    /// Maximum number of distinct cycle vertex-sets to enumerate.
    pub cycle_cap: usize,
    /// Maximum number of distinct layered-shell chains to enumerate.
    pub shell_chain_cap: usize,
    /// Maximum edge depth explored when searching for shell chains.
    pub shell_depth_cap: usize,
    /// Minimum distinct counterparties within a window to call it a fan.
    pub fan_threshold: usize,
    /// Sliding-window width (hours) used by the fan-in/fan-out detectors.
    pub fan_window_hours: i64,
    /// PageRank damping factor.
    pub pagerank_damping: f64,
    /// PageRank convergence tolerance (L1 norm of the iterate delta).
    pub pagerank_tolerance: f64,
    /// PageRank iteration cap.
    pub pagerank_max_iterations: usize,
    /// Number of source nodes sampled for approximate betweenness.
    pub betweenness_sample_k: usize,
    /// Fixed seed for deterministic betweenness source sampling.
    pub betweenness_seed: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            suspicion_threshold: 25.0,
            pattern_weights: PatternWeights::default(),
            velocity_cutoff: 20.0,
            small_amount_cutoff: 500.0,
            betweenness_tiers: [0.02, 0.05],
            pagerank_cutoff: 0.02,
            merchant_reduction: 30.0,
            payroll_reduction: 25.0,
            cycle_cap: 500,
            shell_chain_cap: 200,
            shell_depth_cap: 6,
            fan_threshold: 10,
            fan_window_hours: 72,
            pagerank_damping: 0.85,
            pagerank_tolerance: 1e-4,
            pagerank_max_iterations: 50,
            betweenness_sample_k: 100,
            betweenness_seed: 0x5EED_F0AC_E5ED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pattern_weights_match_spec_table() {
        let weights = PatternWeights::default();
        assert_eq!(weights.score_for(Tag::CycleLength3), 35.0);
        assert_eq!(weights.score_for(Tag::CycleLength4), 30.0);
        assert_eq!(weights.score_for(Tag::CycleLength5), 25.0);
        assert_eq!(weights.score_for(Tag::FanIn), 30.0);
        assert_eq!(weights.score_for(Tag::FanOut), 30.0);
        assert_eq!(weights.score_for(Tag::LayeredShell), 25.0);
        assert_eq!(weights.score_for(Tag::HighVelocity), 10.0);
    }

    #[test]
    fn default_config_matches_spec_constants() {
        let config = DetectionConfig::default();
        assert_eq!(config.suspicion_threshold, 25.0);
        assert_eq!(config.cycle_cap, 500);
        assert_eq!(config.shell_chain_cap, 200);
        assert_eq!(config.shell_depth_cap, 6);
        assert_eq!(config.fan_threshold, 10);
        assert_eq!(config.fan_window_hours, 72);
        assert_eq!(config.pagerank_damping, 0.85);
        assert_eq!(config.betweenness_sample_k, 100);
    }
}
