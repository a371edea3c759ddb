//! Read-only reference tables: airport directory and aircraft performance.
//!
//! Both tables are loaded once and shared immutably for the lifetime of the
//! process. Built-in tables cover a North Atlantic track system sample.

use std::collections::BTreeMap;

use crate::error::ReferenceDataError;
use crate::models::{AircraftProfile, Airport, OperatingHours};
use crate::spatial::haversine_distance_nm;

/// Airport lookup keyed by (upper-case) airport code.
#[derive(Debug, Clone, Default)]
pub struct AirportDirectory {
    airports: BTreeMap<String, Airport>,
}

impl AirportDirectory {
    pub fn new(airports: Vec<Airport>) -> Result<Self, ReferenceDataError> {
        let mut map = BTreeMap::new();
        for mut airport in airports {
            airport.code = airport.code.trim().to_uppercase();
            if map.contains_key(&airport.code) {
                return Err(ReferenceDataError::DuplicateAirport(airport.code));
            }
            map.insert(airport.code.clone(), airport);
        }
        Ok(Self { airports: map })
    }

    /// Parse a JSON array of airport records.
    pub fn from_json(raw: &str) -> Result<Self, ReferenceDataError> {
        let airports: Vec<Airport> = serde_json::from_str(raw)?;
        Self::new(airports)
    }

    pub fn get(&self, code: &str) -> Option<&Airport> {
        self.airports.get(&code.trim().to_uppercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Airport> {
        self.airports.values()
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    /// Well-formed airports within `radius_nm` of a point, with their
    /// great-circle distance. Malformed records are skipped.
    pub fn within_radius(&self, lat: f64, lon: f64, radius_nm: f64) -> Vec<(&Airport, f64)> {
        self.airports
            .values()
            .filter_map(|airport| {
                if !airport.is_well_formed() {
                    tracing::debug!("Skipping malformed airport record {}", airport.code);
                    return None;
                }
                let distance_nm = haversine_distance_nm(lat, lon, airport.lat, airport.lon);
                (distance_nm <= radius_nm).then_some((airport, distance_nm))
            })
            .collect()
    }

    /// Built-in directory.
    pub fn builtin() -> Self {
        let airports = builtin_airports();
        let mut map = BTreeMap::new();
        for airport in airports {
            map.insert(airport.code.clone(), airport);
        }
        Self { airports: map }
    }
}

/// Aircraft performance lookup keyed by (upper-case) type designator.
#[derive(Debug, Clone, Default)]
pub struct AircraftPerformanceTable {
    profiles: BTreeMap<String, AircraftProfile>,
}

impl AircraftPerformanceTable {
    pub fn new(profiles: Vec<AircraftProfile>) -> Result<Self, ReferenceDataError> {
        let mut map = BTreeMap::new();
        for mut profile in profiles {
            profile.aircraft_type = profile.aircraft_type.trim().to_uppercase();
            let constants = [
                profile.cruise_speed_kts,
                profile.fuel_burn_kg_per_hr,
                profile.max_range_nm,
                profile.min_runway_ft,
            ];
            if constants.iter().any(|value| !value.is_finite() || *value <= 0.0) {
                return Err(ReferenceDataError::InvalidAircraft(profile.aircraft_type));
            }
            if map.contains_key(&profile.aircraft_type) {
                return Err(ReferenceDataError::DuplicateAircraft(profile.aircraft_type));
            }
            map.insert(profile.aircraft_type.clone(), profile);
        }
        Ok(Self { profiles: map })
    }

    /// Parse a JSON array of aircraft profiles.
    pub fn from_json(raw: &str) -> Result<Self, ReferenceDataError> {
        let profiles: Vec<AircraftProfile> = serde_json::from_str(raw)?;
        Self::new(profiles)
    }

    pub fn get(&self, aircraft_type: &str) -> Option<&AircraftProfile> {
        self.profiles.get(&aircraft_type.trim().to_uppercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AircraftProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Built-in performance table.
    pub fn builtin() -> Self {
        let mut map = BTreeMap::new();
        for profile in builtin_aircraft() {
            map.insert(profile.aircraft_type.clone(), profile);
        }
        Self { profiles: map }
    }
}

#[allow(clippy::too_many_arguments)]
fn airport(
    code: &str,
    name: &str,
    lat: f64,
    lon: f64,
    elevation_ft: f64,
    runway_length_ft: f64,
    medical_facilities: bool,
    fire_rescue: bool,
    maintenance: bool,
    operating_hours: OperatingHours,
) -> Airport {
    Airport {
        code: code.to_string(),
        name: name.to_string(),
        lat,
        lon,
        elevation_ft,
        runway_length_ft,
        medical_facilities,
        fire_rescue,
        maintenance,
        operating_hours,
        fuel_available: true,
        weather: None,
    }
}

fn builtin_airports() -> Vec<Airport> {
    use OperatingHours::{Limited, TwentyFourSeven};

    vec![
        airport("KJFK", "New York John F. Kennedy", 40.6413, -73.7781, 13.0, 14_511.0, true, true, true, TwentyFourSeven),
        airport("KBOS", "Boston Logan", 42.3656, -71.0096, 20.0, 10_083.0, true, true, true, TwentyFourSeven),
        airport("CYHZ", "Halifax Stanfield", 44.8808, -63.5086, 477.0, 10_500.0, true, true, false, TwentyFourSeven),
        airport("CYQX", "Gander International", 48.9369, -54.5681, 496.0, 10_200.0, false, true, false, TwentyFourSeven),
        airport("CYYT", "St. John's International", 47.6186, -52.7519, 461.0, 8_502.0, true, true, false, TwentyFourSeven),
        airport("CYJT", "Stephenville", 48.5442, -58.5500, 84.0, 10_000.0, false, true, false, Limited { open_utc: 10, close_utc: 2 }),
        airport("CYDF", "Deer Lake Regional", 49.2108, -57.3914, 72.0, 8_005.0, false, true, false, Limited { open_utc: 9, close_utc: 3 }),
        airport("CYWK", "Wabush", 52.9219, -66.8644, 1_808.0, 6_000.0, false, false, false, Limited { open_utc: 11, close_utc: 23 }),
        airport("BGSF", "Kangerlussuaq", 67.0122, -50.7116, 165.0, 9_219.0, false, true, false, Limited { open_utc: 10, close_utc: 22 }),
        airport("BIKF", "Keflavik International", 63.9850, -22.6056, 171.0, 10_056.0, true, true, true, TwentyFourSeven),
        airport("BIRK", "Reykjavik Domestic", 64.1300, -21.9406, 48.0, 5_141.0, true, false, false, Limited { open_utc: 7, close_utc: 23 }),
        airport("LPLA", "Lajes Field", 38.7618, -27.0908, 180.0, 10_865.0, false, true, false, Limited { open_utc: 7, close_utc: 23 }),
        airport("EINN", "Shannon", 52.7020, -8.9248, 46.0, 10_495.0, true, true, true, TwentyFourSeven),
        airport("EGPK", "Glasgow Prestwick", 55.5094, -4.5867, 65.0, 9_800.0, false, true, true, TwentyFourSeven),
        airport("EGLL", "London Heathrow", 51.4700, -0.4543, 83.0, 12_799.0, true, true, true, TwentyFourSeven),
    ]
}

fn builtin_aircraft() -> Vec<AircraftProfile> {
    let profile = |aircraft_type: &str, speed, burn, range, runway, cost| AircraftProfile {
        aircraft_type: aircraft_type.to_string(),
        cruise_speed_kts: speed,
        fuel_burn_kg_per_hr: burn,
        max_range_nm: range,
        min_runway_ft: runway,
        hourly_operating_cost: cost,
    };

    vec![
        profile("B777", 490.0, 7_500.0, 7_370.0, 8_000.0, 18_000.0),
        profile("B789", 488.0, 5_600.0, 7_635.0, 8_500.0, 16_000.0),
        profile("A330", 470.0, 5_800.0, 6_350.0, 7_500.0, 14_000.0),
        profile("B738", 453.0, 2_500.0, 2_935.0, 6_500.0, 7_500.0),
        profile("A320", 450.0, 2_400.0, 3_300.0, 6_500.0, 7_000.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_are_populated() {
        let airports = AirportDirectory::builtin();
        assert!(airports.len() >= 10);
        assert!(airports.iter().all(Airport::is_well_formed));

        let aircraft = AircraftPerformanceTable::builtin();
        assert!(aircraft.get("b777").is_some());
        assert!(aircraft.get("A380").is_none());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let airports = AirportDirectory::builtin();
        assert_eq!(airports.get("cyqx").map(|a| a.name.as_str()), Some("Gander International"));
    }

    #[test]
    fn within_radius_uses_great_circle_distance() {
        let airports = AirportDirectory::builtin();
        // Gander sits ~100nm west of St. John's.
        let near = airports.within_radius(47.6186, -52.7519, 150.0);
        let codes: Vec<&str> = near.iter().map(|(a, _)| a.code.as_str()).collect();
        assert!(codes.contains(&"CYYT"));
        assert!(codes.contains(&"CYQX"));
        assert!(!codes.contains(&"EGLL"));
    }

    #[test]
    fn rejects_duplicate_codes() {
        let raw = r#"[
            {"code":"XXXX","name":"A","lat":1.0,"lon":1.0,"runway_length_ft":9000.0,
             "operating_hours":{"kind":"twenty_four_seven"}},
            {"code":"xxxx","name":"B","lat":2.0,"lon":2.0,"runway_length_ft":9000.0,
             "operating_hours":{"kind":"twenty_four_seven"}}
        ]"#;
        assert!(matches!(
            AirportDirectory::from_json(raw),
            Err(ReferenceDataError::DuplicateAirport(code)) if code == "XXXX"
        ));
    }

    #[test]
    fn malformed_airports_are_excluded_from_radius_queries() {
        let mut broken = AirportDirectory::builtin().get("CYQX").cloned().unwrap();
        broken.code = "BAD1".into();
        broken.runway_length_ft = f64::NAN;
        let directory = AirportDirectory::new(vec![broken]).unwrap();
        assert!(directory.within_radius(48.9, -54.5, 500.0).is_empty());
    }

    #[test]
    fn rejects_aircraft_with_zero_speed() {
        let raw = r#"[{"aircraft_type":"X1","cruise_speed_kts":0.0,"fuel_burn_kg_per_hr":100.0,
            "max_range_nm":100.0,"min_runway_ft":1000.0,"hourly_operating_cost":10.0}]"#;
        assert!(matches!(
            AircraftPerformanceTable::from_json(raw),
            Err(ReferenceDataError::InvalidAircraft(_))
        ));
    }
}
