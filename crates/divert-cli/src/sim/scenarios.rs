//! Scripted emergency scenarios for the simulator.
//!
//! Every scenario flies the same oceanic track; what differs is which signals
//! appear once the trigger time has passed.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use clap::ValueEnum;
use divert_core::models::{
    EmergencyType, FlightState, MedicalAlert, Severity, SideSignals, Subsystem, SystemWarning,
    WarningLevel, WeatherSeverity,
};

use super::paths::{FlightPath, GreatCirclePath};

/// Oceanic track start, east of Newfoundland.
const TRACK_START: (f64, f64) = (50.0, -45.0);
/// Shannon.
const TRACK_END: (f64, f64) = (52.702, -8.9248);
const CRUISE_ALTITUDE_FT: f64 = 37_000.0;
const CRUISE_SPEED_KTS: f64 = 490.0;
const CRUISE_BURN_KG_PER_S: f64 = 7_500.0 / 3600.0;
/// Extra fuel loss during the fuel-leak scenario.
const LEAK_KG_PER_S: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScenarioKind {
    Nominal,
    Medical,
    Engine,
    Fuel,
    Weather,
    Security,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioKind::Nominal => "nominal",
            ScenarioKind::Medical => "medical",
            ScenarioKind::Engine => "engine",
            ScenarioKind::Fuel => "fuel",
            ScenarioKind::Weather => "weather",
            ScenarioKind::Security => "security",
        };
        f.write_str(name)
    }
}

/// A flight whose telemetry and signals are a function of elapsed time.
pub struct ScriptedFlight {
    pub flight_id: String,
    pub aircraft_type: String,
    pub kind: ScenarioKind,
    pub path: Arc<dyn FlightPath>,
    pub initial_fuel_kg: f64,
    pub passengers: u32,
    pub crew: u32,
    pub destination: String,
    /// Seconds before the scenario's first signal appears
    pub trigger_after_s: f64,
}

impl ScriptedFlight {
    /// Telemetry and side signals `t` seconds into the run.
    pub fn frame(&self, t: f64) -> (FlightState, SideSignals) {
        let triggered = t >= self.trigger_after_s;
        let escalated = t >= 2.0 * self.trigger_after_s;

        let mut fuel_remaining_kg = self.initial_fuel_kg - CRUISE_BURN_KG_PER_S * t;
        if self.kind == ScenarioKind::Fuel && triggered {
            fuel_remaining_kg -= LEAK_KG_PER_S * (t - self.trigger_after_s);
        }

        let mut flight = FlightState {
            flight_id: self.flight_id.clone(),
            aircraft_type: self.aircraft_type.clone(),
            position: self.path.position(t),
            airspeed_kts: self.path.ground_speed_kts(),
            fuel_remaining_kg: fuel_remaining_kg.max(0.0),
            declared_emergency: None,
            system_warnings: Vec::new(),
            passengers: self.passengers,
            crew: self.crew,
            destination: Some(self.destination.clone()),
            timestamp: Utc::now(),
        };
        let mut signals = SideSignals::default();

        if !triggered {
            return (flight, signals);
        }

        match self.kind {
            ScenarioKind::Nominal => {}
            ScenarioKind::Medical => {
                signals.medical_alert = Some(MedicalAlert {
                    severity: if escalated { Severity::Critical } else { Severity::High },
                    description: "passenger with chest pain, oxygen administered".to_string(),
                });
                if escalated {
                    flight.declared_emergency = Some(EmergencyType::Medical);
                }
            }
            ScenarioKind::Engine => {
                let (level, message) = if escalated {
                    (WarningLevel::Warning, "ENG 2 FAIL")
                } else {
                    (WarningLevel::Caution, "ENG 2 OIL PRESS LOW")
                };
                flight
                    .system_warnings
                    .push(SystemWarning::new(Subsystem::Engine, level, message));
                if escalated {
                    flight.declared_emergency = Some(EmergencyType::Technical);
                }
            }
            ScenarioKind::Fuel => {}
            ScenarioKind::Weather => {
                signals.weather = Some(if escalated {
                    WeatherSeverity::Extreme
                } else {
                    WeatherSeverity::Severe
                });
            }
            ScenarioKind::Security => {
                signals.security_alert = Some("unruly passenger attempting flight deck access".to_string());
                flight.declared_emergency = Some(EmergencyType::Security);
            }
        }

        (flight, signals)
    }
}

/// Build the scripted flight for a scenario.
pub fn build_scenario(kind: ScenarioKind, flight_id: &str, trigger_after_s: f64) -> ScriptedFlight {
    let path = Arc::new(GreatCirclePath::new(
        TRACK_START,
        TRACK_END,
        CRUISE_ALTITUDE_FT,
        CRUISE_SPEED_KTS,
    ));
    let initial_fuel_kg = match kind {
        ScenarioKind::Fuel => 9_000.0,
        _ => 62_000.0,
    };

    ScriptedFlight {
        flight_id: flight_id.to_string(),
        aircraft_type: "B777".to_string(),
        kind,
        path,
        initial_fuel_kg,
        passengers: 296,
        crew: 14,
        destination: "EINN".to_string(),
        trigger_after_s: trigger_after_s.max(0.0),
    }
}
