//! Outcome sampling for recorded decisions.
//!
//! Actual cost and time are not observed by this system; they are either
//! copied from the estimate or drawn from a bounded simulation. Neither mode
//! feeds back into scoring.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::DecisionOption;

/// Which sampler a deployment runs with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    /// Actual values equal the estimate
    Estimate,
    /// Actual values drawn with bounded variance around the estimate
    #[default]
    Simulated,
}

/// Sampled "actual" values for an executed option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledOutcome {
    pub actual_cost: f64,
    pub actual_time_min: f64,
}

pub trait OutcomeSampler: Send {
    fn sample(&mut self, option: &DecisionOption) -> SampledOutcome;

    fn mode(&self) -> SamplingMode;
}

/// Deterministic sampler: actual == estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateSampler;

impl OutcomeSampler for EstimateSampler {
    fn sample(&mut self, option: &DecisionOption) -> SampledOutcome {
        SampledOutcome {
            actual_cost: option.cost_impact,
            actual_time_min: option.time_impact_min,
        }
    }

    fn mode(&self) -> SamplingMode {
        SamplingMode::Estimate
    }
}

/// Simulation sampler with uniform, bounded relative variance.
#[derive(Debug, Clone)]
pub struct SimulatedVariance {
    rng: StdRng,
    /// Maximum relative deviation of cost (0.15 = ±15%)
    pub cost_variance: f64,
    /// Maximum relative deviation of time
    pub time_variance: f64,
}

impl SimulatedVariance {
    pub const DEFAULT_COST_VARIANCE: f64 = 0.15;
    pub const DEFAULT_TIME_VARIANCE: f64 = 0.10;

    /// Seeded simulations are reproducible; `None` seeds from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            cost_variance: Self::DEFAULT_COST_VARIANCE,
            time_variance: Self::DEFAULT_TIME_VARIANCE,
        }
    }

    fn jitter(&mut self, value: f64, variance: f64) -> f64 {
        let variance = variance.abs();
        if variance <= f64::EPSILON {
            return value;
        }
        let factor = 1.0 + self.rng.random_range(-variance..=variance);
        (value * factor).max(0.0)
    }
}

impl OutcomeSampler for SimulatedVariance {
    fn sample(&mut self, option: &DecisionOption) -> SampledOutcome {
        SampledOutcome {
            actual_cost: self.jitter(option.cost_impact, self.cost_variance),
            actual_time_min: self.jitter(option.time_impact_min, self.time_variance),
        }
    }

    fn mode(&self) -> SamplingMode {
        SamplingMode::Simulated
    }
}

/// Build the sampler for a configured mode.
pub fn sampler_for(mode: SamplingMode, seed: Option<u64>) -> Box<dyn OutcomeSampler> {
    match mode {
        SamplingMode::Estimate => Box::new(EstimateSampler),
        SamplingMode::Simulated => Box::new(SimulatedVariance::new(seed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConsequenceProfile, ImpactLevel, OptionId, RiskLevel};

    fn option() -> DecisionOption {
        DecisionOption {
            id: OptionId::Hold,
            title: "Hold and assess".into(),
            risk_level: RiskLevel::Medium,
            cost_impact: 10_000.0,
            time_impact_min: 30.0,
            safety_score: 40.0,
            feasibility: 100.0,
            composite_score: 70.0,
            distance_nm: 0.0,
            fuel_required_kg: 3_750.0,
            consequences: ConsequenceProfile {
                fuel: ImpactLevel::Minimal,
                passengers: ImpactLevel::Minimal,
                crew: ImpactLevel::Minimal,
                operational: ImpactLevel::Moderate,
            },
            requirements: Vec::new(),
        }
    }

    #[test]
    fn estimate_sampler_returns_estimate() {
        let sampled = EstimateSampler.sample(&option());
        assert_eq!(sampled.actual_cost, 10_000.0);
        assert_eq!(sampled.actual_time_min, 30.0);
    }

    #[test]
    fn simulated_variance_stays_within_bounds() {
        let mut sampler = SimulatedVariance::new(Some(7));
        for _ in 0..200 {
            let sampled = sampler.sample(&option());
            assert!((8_499.0..=11_501.0).contains(&sampled.actual_cost));
            assert!((26.99..=33.01).contains(&sampled.actual_time_min));
        }
    }

    #[test]
    fn seeded_simulation_is_reproducible() {
        let mut a = SimulatedVariance::new(Some(42));
        let mut b = SimulatedVariance::new(Some(42));
        assert_eq!(a.sample(&option()), b.sample(&option()));
    }
}
