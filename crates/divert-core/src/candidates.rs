//! Diversion candidate generation.
//!
//! Finds airports within a search radius, drops the ones the aircraft cannot
//! physically use, and computes the leg time and fuel for the rest.

use std::cmp::Ordering;

use crate::models::{AircraftProfile, DiversionCandidate, Position};
use crate::policy::DecisionPolicy;
use crate::reference::AirportDirectory;

/// Flight time and fuel for a direct leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegEstimate {
    pub flight_time_min: f64,
    pub fuel_required_kg: f64,
}

/// Estimate a direct leg: cruise time plus approach overhead, and the fuel
/// burned over that time plus the holding/approach reserve.
pub fn estimate_leg(distance_nm: f64, profile: &AircraftProfile, policy: &DecisionPolicy) -> LegEstimate {
    let cruise_min = distance_nm / profile.cruise_speed_kts * 60.0;
    let flight_time_min = cruise_min + policy.approach_overhead_min;
    let fuel_required_kg =
        flight_time_min / 60.0 * profile.fuel_burn_kg_per_hr + policy.reserve_fuel_kg;
    LegEstimate {
        flight_time_min,
        fuel_required_kg,
    }
}

/// Generate diversion candidates around `position`.
///
/// The search radius is clamped to the aircraft's maximum range. Airports with
/// a runway shorter than the type minimum are excluded, as is the filed
/// destination (offered separately as "continue"). The result is sorted by
/// distance and capped at `policy.max_candidates`; it may be empty.
pub fn generate_candidates(
    position: &Position,
    profile: &AircraftProfile,
    airports: &AirportDirectory,
    max_radius_nm: f64,
    destination: Option<&str>,
    policy: &DecisionPolicy,
) -> Vec<DiversionCandidate> {
    let radius_nm = max_radius_nm.min(profile.max_range_nm).max(0.0);
    let destination = destination.map(|code| code.trim().to_uppercase());

    let mut candidates: Vec<DiversionCandidate> = airports
        .within_radius(position.lat, position.lon, radius_nm)
        .into_iter()
        .filter(|(airport, _)| Some(&airport.code) != destination.as_ref())
        .filter(|(airport, _)| {
            let usable = airport.runway_length_ft >= profile.min_runway_ft;
            if !usable {
                tracing::debug!(
                    "Excluding {}: runway {:.0}ft below {} minimum {:.0}ft",
                    airport.code,
                    airport.runway_length_ft,
                    profile.aircraft_type,
                    profile.min_runway_ft
                );
            }
            usable
        })
        .map(|(airport, distance_nm)| {
            let leg = estimate_leg(distance_nm, profile, policy);
            DiversionCandidate {
                capabilities: airport.capabilities(),
                airport: airport.clone(),
                distance_nm,
                flight_time_min: leg.flight_time_min,
                fuel_required_kg: leg.fuel_required_kg,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.distance_nm
            .partial_cmp(&b.distance_nm)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.airport.code.cmp(&b.airport.code))
    });
    candidates.truncate(policy.max_candidates);
    candidates
}
