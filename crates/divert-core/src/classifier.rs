//! Emergency classification.
//!
//! A pure function of the current flight state and side-channel signals.
//! Every detection rule runs; the most severe detected scenario wins.

use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    EmergencyScenario, EmergencyType, FlightState, SideSignals, Severity, Subsystem,
    WarningLevel, WeatherSeverity,
};
use crate::policy::DecisionPolicy;

/// Raw detection before it is stamped into a scenario.
#[derive(Debug, Clone)]
struct Detection {
    scenario_type: EmergencyType,
    severity: Severity,
    diversion_required: bool,
    description: String,
}

/// Classify the current state. Returns `None` when nothing meets a
/// detection threshold.
pub fn classify_emergency(
    flight: &FlightState,
    signals: &SideSignals,
    policy: &DecisionPolicy,
) -> Option<EmergencyScenario> {
    let mut detections = Vec::new();
    detections.extend(detect_medical(signals));
    detections.extend(detect_technical(flight));
    detections.extend(detect_fuel(flight, policy));
    detections.extend(detect_weather(signals));
    detections.extend(detect_security(signals));

    if let Some(declared) = flight.declared_emergency {
        if !detections.iter().any(|d| d.scenario_type == declared) {
            detections.push(Detection {
                scenario_type: declared,
                severity: Severity::Medium,
                diversion_required: false,
                description: format!("Crew declared {declared} emergency"),
            });
        }
    }

    let best = detections
        .into_iter()
        .max_by_key(|d| (d.severity, d.diversion_required))?;

    let declared = flight.declared_emergency == Some(best.scenario_type);
    Some(EmergencyScenario {
        id: Uuid::new_v4(),
        scenario_type: best.scenario_type,
        severity: best.severity,
        position: flight.position,
        fuel_remaining_kg: flight.fuel_remaining_kg,
        passengers: flight.passengers,
        crew: flight.crew,
        timestamp: Utc::now(),
        requires_immediate: best.severity >= Severity::High || declared,
        diversion_required: best.diversion_required,
        declared,
        description: best.description,
    })
}

fn detect_medical(signals: &SideSignals) -> Option<Detection> {
    let alert = signals.medical_alert.as_ref()?;
    let description = if alert.description.trim().is_empty() {
        "Medical event on board".to_string()
    } else {
        format!("Medical event on board: {}", alert.description.trim())
    };
    Some(Detection {
        scenario_type: EmergencyType::Medical,
        severity: alert.severity,
        diversion_required: alert.severity >= Severity::High,
        description,
    })
}

fn detect_technical(flight: &FlightState) -> Option<Detection> {
    flight
        .system_warnings
        .iter()
        .filter(|w| w.subsystem.is_critical() && w.level >= WarningLevel::Caution)
        .map(|w| {
            let severity = match (w.level, w.subsystem) {
                (WarningLevel::Warning, Subsystem::Engine | Subsystem::Pressurization) => {
                    Severity::Critical
                }
                (WarningLevel::Warning, _) => Severity::High,
                _ => Severity::Medium,
            };
            let description = if w.message.trim().is_empty() {
                format!("{} {:?}", w.subsystem, w.level).to_lowercase()
            } else {
                format!("{}: {}", w.subsystem, w.message.trim())
            };
            Detection {
                scenario_type: EmergencyType::Technical,
                severity,
                diversion_required: severity >= Severity::High,
                description,
            }
        })
        .max_by_key(|d| d.severity)
}

fn detect_fuel(flight: &FlightState, policy: &DecisionPolicy) -> Option<Detection> {
    if flight.fuel_remaining_kg >= policy.fuel_floor_kg {
        return None;
    }
    let severity = if flight.fuel_remaining_kg < policy.fuel_floor_kg / 2.0 {
        Severity::Critical
    } else {
        Severity::High
    };
    Some(Detection {
        scenario_type: EmergencyType::Fuel,
        severity,
        diversion_required: true,
        description: format!(
            "Fuel remaining {:.0} kg below floor of {:.0} kg",
            flight.fuel_remaining_kg, policy.fuel_floor_kg
        ),
    })
}

fn detect_weather(signals: &SideSignals) -> Option<Detection> {
    let (severity, diversion_required) = match signals.weather? {
        WeatherSeverity::Severe => (Severity::High, false),
        WeatherSeverity::Extreme => (Severity::Critical, true),
        WeatherSeverity::Light | WeatherSeverity::Moderate => return None,
    };
    Some(Detection {
        scenario_type: EmergencyType::Weather,
        severity,
        diversion_required,
        description: format!("{severity} weather on route"),
    })
}

fn detect_security(signals: &SideSignals) -> Option<Detection> {
    let report = signals.security_alert.as_deref()?;
    Some(Detection {
        scenario_type: EmergencyType::Security,
        severity: Severity::Critical,
        diversion_required: true,
        description: format!("Security threat reported: {}", report.trim()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MedicalAlert, Position, SystemWarning};

    fn flight() -> FlightState {
        FlightState {
            flight_id: "AC850".into(),
            aircraft_type: "B777".into(),
            position: Position::new(50.0, -40.0, 37_000.0),
            airspeed_kts: 490.0,
            fuel_remaining_kg: 50_000.0,
            declared_emergency: None,
            system_warnings: Vec::new(),
            passengers: 320,
            crew: 14,
            destination: Some("EGLL".into()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn nominal_flight_has_no_scenario() {
        let policy = DecisionPolicy::default();
        assert!(classify_emergency(&flight(), &SideSignals::default(), &policy).is_none());
    }

    #[test]
    fn light_weather_and_non_critical_warnings_are_ignored() {
        let policy = DecisionPolicy::default();
        let mut state = flight();
        state.system_warnings.push(SystemWarning::new(
            Subsystem::Avionics,
            WarningLevel::Warning,
            "FMS 2 fault",
        ));
        let signals = SideSignals {
            weather: Some(WeatherSeverity::Moderate),
            ..Default::default()
        };
        assert!(classify_emergency(&state, &signals, &policy).is_none());
    }

    #[test]
    fn medical_alert_carries_signal_severity() {
        let policy = DecisionPolicy::default();
        let signals = SideSignals {
            medical_alert: Some(MedicalAlert {
                severity: Severity::Critical,
                description: "cardiac arrest, row 32".into(),
            }),
            ..Default::default()
        };
        let scenario = classify_emergency(&flight(), &signals, &policy).unwrap();
        assert_eq!(scenario.scenario_type, EmergencyType::Medical);
        assert_eq!(scenario.severity, Severity::Critical);
        assert!(scenario.requires_immediate);
        assert!(scenario.diversion_required);
        assert_eq!(scenario.passengers, 320);
    }

    #[test]
    fn engine_warning_is_critical_technical() {
        let policy = DecisionPolicy::default();
        let mut state = flight();
        state.system_warnings.push(SystemWarning::new(
            Subsystem::Engine,
            WarningLevel::Warning,
            "ENG 2 FIRE",
        ));
        let scenario = classify_emergency(&state, &SideSignals::default(), &policy).unwrap();
        assert_eq!(scenario.scenario_type, EmergencyType::Technical);
        assert_eq!(scenario.severity, Severity::Critical);
        assert!(scenario.description.contains("ENG 2 FIRE"));
    }

    #[test]
    fn fuel_below_floor_is_detected() {
        let policy = DecisionPolicy::default();
        let mut state = flight();
        state.fuel_remaining_kg = 4_000.0;
        let scenario = classify_emergency(&state, &SideSignals::default(), &policy).unwrap();
        assert_eq!(scenario.scenario_type, EmergencyType::Fuel);
        assert_eq!(scenario.severity, Severity::High);

        state.fuel_remaining_kg = 2_000.0;
        let scenario = classify_emergency(&state, &SideSignals::default(), &policy).unwrap();
        assert_eq!(scenario.severity, Severity::Critical);
    }

    #[test]
    fn most_severe_scenario_wins() {
        let policy = DecisionPolicy::default();
        let mut state = flight();
        state.system_warnings.push(SystemWarning::new(
            Subsystem::Hydraulics,
            WarningLevel::Warning,
            "HYD SYS A LOW PRESS",
        ));
        let signals = SideSignals {
            medical_alert: Some(MedicalAlert {
                severity: Severity::Medium,
                description: String::new(),
            }),
            ..Default::default()
        };
        let scenario = classify_emergency(&state, &signals, &policy).unwrap();
        assert_eq!(scenario.scenario_type, EmergencyType::Technical);
        assert_eq!(scenario.severity, Severity::High);
    }

    #[test]
    fn equal_severity_prefers_diversion_required() {
        let policy = DecisionPolicy::default();
        let mut state = flight();
        // High fuel emergency (diversion required) vs severe weather (high, no diversion).
        state.fuel_remaining_kg = 4_500.0;
        let signals = SideSignals {
            weather: Some(WeatherSeverity::Severe),
            ..Default::default()
        };
        let scenario = classify_emergency(&state, &signals, &policy).unwrap();
        assert_eq!(scenario.scenario_type, EmergencyType::Fuel);
        assert!(scenario.diversion_required);
    }

    #[test]
    fn declared_emergency_without_detection_is_medium() {
        let policy = DecisionPolicy::default();
        let mut state = flight();
        state.declared_emergency = Some(EmergencyType::Security);
        let scenario = classify_emergency(&state, &SideSignals::default(), &policy).unwrap();
        assert_eq!(scenario.scenario_type, EmergencyType::Security);
        assert_eq!(scenario.severity, Severity::Medium);
        assert!(scenario.declared);
        assert!(scenario.requires_immediate);
    }

    #[test]
    fn declared_flag_marks_matching_detection() {
        let policy = DecisionPolicy::default();
        let mut state = flight();
        state.declared_emergency = Some(EmergencyType::Medical);
        let signals = SideSignals {
            medical_alert: Some(MedicalAlert {
                severity: Severity::Low,
                description: "passenger fainted".into(),
            }),
            ..Default::default()
        };
        let scenario = classify_emergency(&state, &signals, &policy).unwrap();
        assert_eq!(scenario.severity, Severity::Low);
        assert!(scenario.declared);
        assert!(scenario.requires_immediate);
    }
}
