//! Multi-criteria suitability scoring.
//!
//! Turns diversion candidates and the two non-diversion choices (continue,
//! hold) into scored [`DecisionOption`]s. Scoring is deterministic: identical
//! inputs always produce identical scores.

use crate::candidates::estimate_leg;
use crate::models::{
    AircraftProfile, Airport, ConsequenceProfile, DecisionOption, DiversionCandidate,
    EmergencyScenario, EmergencyType, FlightState, ImpactLevel, OptionId, RiskLevel,
    WeatherSeverity,
};
use crate::policy::{DecisionPolicy, ScoringWeights};

/// Cost (USD) that maps to one point of the cost term.
const COST_SCALE: f64 = 1_000.0;
/// Minutes that map to one point of the time term.
const TIME_SCALE: f64 = 10.0;

const FUEL_RATIO_SEVERE: f64 = 0.8;
const FUEL_RATIO_TIGHT: f64 = 0.6;

/// Everything the scorer needs besides the option itself.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub flight: &'a FlightState,
    pub scenario: &'a EmergencyScenario,
    pub profile: &'a AircraftProfile,
    pub policy: &'a DecisionPolicy,
}

/// Airport safety score for a scenario, clamped to [0, 100].
pub fn safety_score(airport: &Airport, scenario_type: EmergencyType, policy: &DecisionPolicy) -> f64 {
    let mut score = 50.0;
    match scenario_type {
        EmergencyType::Medical if airport.medical_facilities => score += 30.0,
        EmergencyType::Technical if airport.maintenance => score += 30.0,
        _ => {}
    }
    if airport.fire_rescue {
        score += 15.0;
    }
    if airport.runway_length_ft >= policy.long_runway_ft {
        score += 10.0;
    }
    if airport.operating_hours.is_24_7() {
        score += 10.0;
    }
    clamp_score(score)
}

/// Feasibility of flying a leg, clamped to [0, 100].
///
/// `runway` is `(available, required)` for options that end on a runway.
pub fn feasibility_score(
    fuel_required_kg: f64,
    fuel_remaining_kg: f64,
    runway: Option<(f64, f64)>,
    weather: Option<WeatherSeverity>,
) -> f64 {
    let mut score = 100.0;

    if fuel_required_kg > FUEL_RATIO_SEVERE * fuel_remaining_kg {
        score -= 40.0;
    } else if fuel_required_kg > FUEL_RATIO_TIGHT * fuel_remaining_kg {
        score -= 20.0;
    }

    // Short runways are filtered upstream; kept as a guard for direct callers.
    if let Some((available_ft, required_ft)) = runway {
        if available_ft < required_ft {
            score -= 50.0;
        }
    }

    match weather {
        Some(WeatherSeverity::Extreme) => score -= 30.0,
        Some(WeatherSeverity::Severe) => score -= 15.0,
        _ => {}
    }

    clamp_score(score)
}

/// Weighted composite score. Safety carries the largest default weight.
pub fn composite_score(
    safety: f64,
    cost: f64,
    time_min: f64,
    feasibility: f64,
    weights: &ScoringWeights,
) -> f64 {
    let cost_term = 100.0 - (cost / COST_SCALE).min(100.0);
    let time_term = 100.0 - (time_min / TIME_SCALE).min(100.0);
    safety * weights.safety
        + cost_term * weights.cost
        + time_term * weights.time
        + feasibility * weights.feasibility
}

/// Score a diversion candidate.
pub fn score_candidate(candidate: &DiversionCandidate, ctx: &ScoringContext<'_>) -> DecisionOption {
    let airport = &candidate.airport;
    let policy = ctx.policy;
    let scenario_type = ctx.scenario.scenario_type;

    let safety = safety_score(airport, scenario_type, policy);
    let feasibility = feasibility_score(
        candidate.fuel_required_kg,
        ctx.flight.fuel_remaining_kg,
        Some((airport.runway_length_ft, ctx.profile.min_runway_ft)),
        airport.weather,
    );
    let cost = leg_cost(candidate.fuel_required_kg, candidate.flight_time_min, ctx)
        + policy.compensation.for_type(scenario_type);

    DecisionOption {
        id: OptionId::Divert(airport.code.clone()),
        title: format!("Divert to {} ({})", airport.name, airport.code),
        risk_level: risk_level(safety, feasibility),
        cost_impact: cost,
        time_impact_min: candidate.flight_time_min,
        safety_score: safety,
        feasibility,
        composite_score: composite_score(
            safety,
            cost,
            candidate.flight_time_min,
            feasibility,
            &policy.weights,
        ),
        distance_nm: candidate.distance_nm,
        fuel_required_kg: candidate.fuel_required_kg,
        consequences: ConsequenceProfile {
            fuel: fuel_impact(candidate.fuel_required_kg, ctx.flight.fuel_remaining_kg),
            passengers: ImpactLevel::Moderate,
            crew: crew_impact(candidate.flight_time_min),
            operational: if airport.fuel_available {
                ImpactLevel::Significant
            } else {
                ImpactLevel::Severe
            },
        },
        requirements: diversion_requirements(airport, ctx.scenario),
    }
}

/// Score continuing to the filed destination `distance_nm` away.
pub fn score_continue(destination: &Airport, distance_nm: f64, ctx: &ScoringContext<'_>) -> DecisionOption {
    let policy = ctx.policy;
    let scenario = ctx.scenario;
    let leg = estimate_leg(distance_nm, ctx.profile, policy);

    let mut safety = safety_score(destination, scenario.scenario_type, policy);
    if scenario.diversion_required {
        safety = clamp_score(safety - policy.continue_diversion_penalty);
    }
    let feasibility = feasibility_score(
        leg.fuel_required_kg,
        ctx.flight.fuel_remaining_kg,
        Some((destination.runway_length_ft, ctx.profile.min_runway_ft)),
        destination.weather,
    );
    let cost = leg_cost(leg.fuel_required_kg, leg.flight_time_min, ctx);

    let passengers = match (scenario.diversion_required, scenario.scenario_type) {
        (true, EmergencyType::Medical) => ImpactLevel::Severe,
        (true, _) => ImpactLevel::Significant,
        (false, _) => ImpactLevel::Minimal,
    };

    let mut requirements = vec![format!(
        "Operations concurrence to continue to {}",
        destination.code
    )];
    if scenario.diversion_required {
        requirements.push(format!(
            "Captain acceptance of continued flight with {} emergency",
            scenario.scenario_type
        ));
    }
    if scenario.scenario_type == EmergencyType::Medical {
        requirements.push("Ground-based medical advisory consultation".to_string());
    }

    DecisionOption {
        id: OptionId::Continue,
        title: format!("Continue to {} ({})", destination.name, destination.code),
        risk_level: risk_level(safety, feasibility),
        cost_impact: cost,
        time_impact_min: leg.flight_time_min,
        safety_score: safety,
        feasibility,
        composite_score: composite_score(
            safety,
            cost,
            leg.flight_time_min,
            feasibility,
            &policy.weights,
        ),
        distance_nm,
        fuel_required_kg: leg.fuel_required_kg,
        consequences: ConsequenceProfile {
            fuel: fuel_impact(leg.fuel_required_kg, ctx.flight.fuel_remaining_kg),
            passengers,
            crew: crew_impact(leg.flight_time_min),
            operational: ImpactLevel::Minimal,
        },
        requirements,
    }
}

/// Score holding in place to reassess.
pub fn score_hold(ctx: &ScoringContext<'_>) -> DecisionOption {
    let policy = ctx.policy;
    let scenario = ctx.scenario;
    let hold_min = policy.hold_duration_min;
    let hold_fuel_kg = hold_min / 60.0 * ctx.profile.fuel_burn_kg_per_hr;

    let mut safety = policy.hold_base_safety;
    if scenario.requires_immediate {
        safety -= 10.0;
    }
    let safety = clamp_score(safety);
    let feasibility = feasibility_score(hold_fuel_kg, ctx.flight.fuel_remaining_kg, None, None);
    let cost = leg_cost(hold_fuel_kg, hold_min, ctx);

    DecisionOption {
        id: OptionId::Hold,
        title: "Hold and assess".to_string(),
        risk_level: risk_level(safety, feasibility),
        cost_impact: cost,
        time_impact_min: hold_min,
        safety_score: safety,
        feasibility,
        composite_score: composite_score(safety, cost, hold_min, feasibility, &policy.weights),
        distance_nm: 0.0,
        fuel_required_kg: hold_fuel_kg,
        consequences: ConsequenceProfile {
            fuel: fuel_impact(hold_fuel_kg, ctx.flight.fuel_remaining_kg),
            passengers: if scenario.requires_immediate {
                ImpactLevel::Moderate
            } else {
                ImpactLevel::Minimal
            },
            crew: crew_impact(hold_min),
            operational: ImpactLevel::Moderate,
        },
        requirements: vec![
            "ATC holding clearance".to_string(),
            format!("Reassess within {hold_min:.0} minutes"),
        ],
    }
}

/// Sort best-first: composite descending, then shorter distance, then lower cost.
pub fn rank_options(options: &mut [DecisionOption]) {
    options.sort_by(|a, b| {
        b.composite_score
            .total_cmp(&a.composite_score)
            .then_with(|| a.distance_nm.total_cmp(&b.distance_nm))
            .then_with(|| a.cost_impact.total_cmp(&b.cost_impact))
    });
}

/// Score every candidate plus the non-diversion options and rank them.
///
/// `destination` is the filed destination and its distance, when known.
pub fn score_options(
    candidates: &[DiversionCandidate],
    destination: Option<(&Airport, f64)>,
    ctx: &ScoringContext<'_>,
) -> Vec<DecisionOption> {
    let mut options: Vec<DecisionOption> = candidates
        .iter()
        .map(|candidate| score_candidate(candidate, ctx))
        .collect();
    if let Some((airport, distance_nm)) = destination {
        options.push(score_continue(airport, distance_nm, ctx));
    }
    options.push(score_hold(ctx));
    rank_options(&mut options);
    options
}

fn leg_cost(fuel_kg: f64, time_min: f64, ctx: &ScoringContext<'_>) -> f64 {
    fuel_kg * ctx.policy.fuel_price_per_kg + time_min / 60.0 * ctx.profile.hourly_operating_cost
}

fn risk_level(safety: f64, feasibility: f64) -> RiskLevel {
    let floor = safety.min(feasibility);
    if floor >= 75.0 {
        RiskLevel::Low
    } else if floor >= 55.0 {
        RiskLevel::Medium
    } else if floor >= 35.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

fn fuel_impact(fuel_required_kg: f64, fuel_remaining_kg: f64) -> ImpactLevel {
    if fuel_remaining_kg <= 0.0 {
        return ImpactLevel::Severe;
    }
    let ratio = fuel_required_kg / fuel_remaining_kg;
    if ratio <= 0.4 {
        ImpactLevel::Minimal
    } else if ratio <= FUEL_RATIO_TIGHT {
        ImpactLevel::Moderate
    } else if ratio <= FUEL_RATIO_SEVERE {
        ImpactLevel::Significant
    } else {
        ImpactLevel::Severe
    }
}

fn crew_impact(time_min: f64) -> ImpactLevel {
    if time_min <= 60.0 {
        ImpactLevel::Minimal
    } else if time_min <= 180.0 {
        ImpactLevel::Moderate
    } else if time_min <= 360.0 {
        ImpactLevel::Significant
    } else {
        ImpactLevel::Severe
    }
}

fn diversion_requirements(airport: &Airport, scenario: &EmergencyScenario) -> Vec<String> {
    let code = &airport.code;
    let mut requirements = vec![format!("ATC clearance for diversion to {code}")];

    match scenario.scenario_type {
        EmergencyType::Medical if airport.medical_facilities => {
            requirements.push(format!("Ground medical team on arrival at {code}"));
        }
        EmergencyType::Medical => {
            requirements.push(format!("Medical transport from {code} to nearest hospital"));
        }
        EmergencyType::Technical => {
            if airport.fire_rescue {
                requirements.push(format!("Fire-rescue standby at {code}"));
            }
            if !airport.maintenance {
                requirements.push(format!("Maintenance team dispatch to {code}"));
            }
        }
        EmergencyType::Security => {
            requirements.push(format!("Security services on arrival at {code}"));
        }
        EmergencyType::Weather | EmergencyType::Fuel => {}
    }

    if !airport.fuel_available {
        requirements.push(format!("Fuel uplift arrangement at {code}"));
    }
    if !airport.operating_hours.is_24_7() {
        requirements.push(format!("Confirm {code} is open on arrival"));
    }
    if airport
        .weather
        .is_some_and(|weather| weather >= WeatherSeverity::Severe)
    {
        requirements.push(format!("Updated weather briefing for {code}"));
    }

    requirements
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}
