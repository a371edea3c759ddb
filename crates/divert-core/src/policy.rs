//! Decision policy: scoring weights, decision windows and operating constants.
//!
//! Every number the scorer and orchestrator rely on lives here so the active
//! policy can be serialized, audited and loaded per operator.

use serde::{Deserialize, Serialize};

use crate::models::{EmergencyScenario, EmergencyType, Severity};

/// Weights of the composite suitability score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub safety: f64,
    pub cost: f64,
    pub time: f64,
    pub feasibility: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            safety: 0.40,
            cost: 0.20,
            time: 0.20,
            feasibility: 0.20,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.safety + self.cost + self.time + self.feasibility
    }
}

/// Decision window lengths in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionWindows {
    /// Critical scenarios
    pub critical_s: u32,
    /// High severity or crew-declared scenarios
    pub urgent_s: u32,
    /// Everything else
    pub default_s: u32,
}

impl Default for DecisionWindows {
    fn default() -> Self {
        Self {
            critical_s: 300,
            urgent_s: 600,
            default_s: 1200,
        }
    }
}

/// Fixed compensation and landing-fee estimate per scenario type (USD).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCompensation {
    pub medical: f64,
    pub technical: f64,
    pub weather: f64,
    pub fuel: f64,
    pub security: f64,
}

impl Default for ScenarioCompensation {
    fn default() -> Self {
        Self {
            medical: 5_000.0,
            technical: 15_000.0,
            weather: 8_000.0,
            fuel: 3_000.0,
            security: 20_000.0,
        }
    }
}

impl ScenarioCompensation {
    pub fn for_type(&self, scenario_type: EmergencyType) -> f64 {
        match scenario_type {
            EmergencyType::Medical => self.medical,
            EmergencyType::Technical => self.technical,
            EmergencyType::Weather => self.weather,
            EmergencyType::Fuel => self.fuel,
            EmergencyType::Security => self.security,
        }
    }
}

/// Complete decision policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPolicy {
    pub weights: ScoringWeights,
    pub windows: DecisionWindows,
    pub compensation: ScenarioCompensation,
    /// Absolute fuel floor below which a fuel emergency exists (kg)
    pub fuel_floor_kg: f64,
    /// Descent and approach time added to every leg (minutes)
    pub approach_overhead_min: f64,
    /// Holding and approach reserve added to every fuel estimate (kg)
    pub reserve_fuel_kg: f64,
    /// Upper bound on candidates passed to the scorer
    pub max_candidates: usize,
    /// Runway length earning the long-runway safety bonus (ft)
    pub long_runway_ft: f64,
    pub fuel_price_per_kg: f64,
    /// Length of the hold-and-assess option (minutes)
    pub hold_duration_min: f64,
    pub hold_base_safety: f64,
    /// Safety deducted from "continue" when the scenario requires diversion
    pub continue_diversion_penalty: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            windows: DecisionWindows::default(),
            compensation: ScenarioCompensation::default(),
            fuel_floor_kg: 5_000.0,
            approach_overhead_min: 15.0,
            reserve_fuel_kg: 2_500.0,
            max_candidates: 8,
            long_runway_ft: 10_000.0,
            fuel_price_per_kg: 0.90,
            hold_duration_min: 30.0,
            hold_base_safety: 40.0,
            continue_diversion_penalty: 30.0,
        }
    }
}

impl DecisionPolicy {
    /// Parse a policy document. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Decision window for a scenario. Depends only on the scenario itself.
    pub fn decision_window(&self, scenario: &EmergencyScenario) -> u32 {
        let window = match scenario.severity {
            Severity::Critical => self.windows.critical_s,
            Severity::High => self.windows.urgent_s,
            _ if scenario.declared => self.windows.urgent_s,
            _ => self.windows.default_s,
        };
        window.max(1)
    }

    /// Validate policy configuration.
    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let w = &self.weights;

        if [w.safety, w.cost, w.time, w.feasibility]
            .iter()
            .any(|weight| !weight.is_finite() || *weight < 0.0)
        {
            errors.push("Scoring weights must be non-negative numbers".to_string());
        }
        if (w.total() - 1.0).abs() > 1e-6 {
            errors.push(format!("Scoring weights must sum to 1.0 (got {:.4})", w.total()));
        }

        let windows = &self.windows;
        if windows.critical_s == 0 || windows.urgent_s == 0 || windows.default_s == 0 {
            errors.push("Decision windows must be strictly positive".to_string());
        }
        if windows.critical_s > windows.urgent_s || windows.urgent_s > windows.default_s {
            errors.push(
                "Decision windows must not lengthen with severity (critical <= urgent <= default)"
                    .to_string(),
            );
        }

        if self.max_candidates == 0 {
            errors.push("max_candidates must be at least 1".to_string());
        }
        if self.fuel_floor_kg < 0.0 || self.reserve_fuel_kg < 0.0 {
            errors.push("Fuel floor and reserve cannot be negative".to_string());
        }
        if self.approach_overhead_min < 0.0 || self.hold_duration_min <= 0.0 {
            errors.push("Approach overhead must be >= 0 and hold duration > 0".to_string());
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        let policy = DecisionPolicy::default();
        assert!(policy.is_valid(), "{:?}", policy.validate());
        assert_eq!(policy.weights.safety, 0.40);
        assert_eq!(policy.windows.critical_s, 300);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let policy = DecisionPolicy::from_json(r#"{"fuel_floor_kg": 6500.0}"#).unwrap();
        assert_eq!(policy.fuel_floor_kg, 6_500.0);
        assert_eq!(policy.weights, ScoringWeights::default());
        assert_eq!(policy.max_candidates, 8);
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut policy = DecisionPolicy::default();
        policy.weights.safety = 0.9;
        assert!(!policy.is_valid());
    }

    #[test]
    fn rejects_inverted_windows() {
        let mut policy = DecisionPolicy::default();
        policy.windows.critical_s = 900;
        assert!(!policy.is_valid());
    }
}
