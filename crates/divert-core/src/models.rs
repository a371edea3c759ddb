//! Core data models for the diversion decision system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ========== FLIGHT STATE ==========

/// Aircraft position snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub altitude_ft: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64, altitude_ft: f64) -> Self {
        Self { lat, lon, altitude_ft }
    }
}

/// Aircraft subsystems that can raise warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    Engine,
    Hydraulics,
    Electrical,
    Pressurization,
    Avionics,
    FuelSystem,
    #[serde(other)]
    Other,
}

impl Subsystem {
    /// Subsystems whose failure is treated as a technical emergency.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            Subsystem::Engine
                | Subsystem::Hydraulics
                | Subsystem::Electrical
                | Subsystem::Pressurization
        )
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Subsystem::Engine => "engine",
            Subsystem::Hydraulics => "hydraulics",
            Subsystem::Electrical => "electrical",
            Subsystem::Pressurization => "pressurization",
            Subsystem::Avionics => "avionics",
            Subsystem::FuelSystem => "fuel system",
            Subsystem::Other => "other",
        };
        f.write_str(name)
    }
}

/// Crew alerting level of a system warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Advisory,
    Caution,
    Warning,
}

/// A system warning reported by the aircraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemWarning {
    pub subsystem: Subsystem,
    pub level: WarningLevel,
    #[serde(default)]
    pub message: String,
}

impl SystemWarning {
    pub fn new(subsystem: Subsystem, level: WarningLevel, message: impl Into<String>) -> Self {
        Self {
            subsystem,
            level,
            message: message.into(),
        }
    }

    /// A warning-level alert on a critical subsystem forces a decision.
    pub fn requires_decision(&self) -> bool {
        self.subsystem.is_critical() && self.level == WarningLevel::Warning
    }
}

/// Live flight state, refreshed every telemetry tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightState {
    pub flight_id: String,
    pub aircraft_type: String,
    pub position: Position,
    #[serde(default)]
    pub airspeed_kts: f64,
    pub fuel_remaining_kg: f64,
    /// Emergency type declared by the crew, if any
    #[serde(default)]
    pub declared_emergency: Option<EmergencyType>,
    #[serde(default)]
    pub system_warnings: Vec<SystemWarning>,
    #[serde(default)]
    pub passengers: u32,
    #[serde(default)]
    pub crew: u32,
    /// Filed destination airport code
    #[serde(default)]
    pub destination: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl FlightState {
    /// True when any current warning requires a decision on its own.
    pub fn has_decision_warning(&self) -> bool {
        self.system_warnings.iter().any(SystemWarning::requires_decision)
    }

    /// Validate telemetry fields.
    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.flight_id.trim().is_empty() {
            errors.push("flight_id must not be empty".to_string());
        }
        if self.aircraft_type.trim().is_empty() {
            errors.push("aircraft_type must not be empty".to_string());
        }
        if !crate::spatial::is_valid_coordinate(self.position.lat, self.position.lon) {
            errors.push(format!(
                "Position ({}, {}) is not a valid coordinate",
                self.position.lat, self.position.lon
            ));
        }
        if !self.position.altitude_ft.is_finite() {
            errors.push("Altitude must be finite".to_string());
        }
        if !self.fuel_remaining_kg.is_finite() || self.fuel_remaining_kg < 0.0 {
            errors.push(format!(
                "Fuel remaining ({}) must be a non-negative number",
                self.fuel_remaining_kg
            ));
        }
        if !self.airspeed_kts.is_finite() || self.airspeed_kts < 0.0 {
            errors.push("Airspeed must be a non-negative number".to_string());
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ========== SIDE SIGNALS ==========

/// Reported intensity of weather affecting the flight or an airport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherSeverity {
    Light,
    Moderate,
    Severe,
    Extreme,
}

/// Medical event reported from the cabin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalAlert {
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

/// Contextual signals that arrive outside the telemetry stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideSignals {
    #[serde(default)]
    pub medical_alert: Option<MedicalAlert>,
    #[serde(default)]
    pub weather: Option<WeatherSeverity>,
    /// Free-text description of a reported security threat
    #[serde(default)]
    pub security_alert: Option<String>,
}

// ========== EMERGENCY SCENARIO ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyType {
    Medical,
    Technical,
    Weather,
    Fuel,
    Security,
}

impl fmt::Display for EmergencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmergencyType::Medical => "medical",
            EmergencyType::Technical => "technical",
            EmergencyType::Weather => "weather",
            EmergencyType::Fuel => "fuel",
            EmergencyType::Security => "security",
        };
        f.write_str(name)
    }
}

/// Scenario severity. Ordering follows urgency: `Critical` is greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// A detected emergency. Immutable once created; a change in conditions
/// produces a new scenario rather than mutating this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyScenario {
    pub id: Uuid,
    pub scenario_type: EmergencyType,
    pub severity: Severity,
    pub position: Position,
    pub fuel_remaining_kg: f64,
    pub passengers: u32,
    pub crew: u32,
    pub timestamp: DateTime<Utc>,
    pub requires_immediate: bool,
    pub diversion_required: bool,
    /// Crew declared an emergency of this type
    pub declared: bool,
    pub description: String,
}

impl EmergencyScenario {
    /// True when `other` describes the same situation (type and severity).
    pub fn same_situation(&self, other: &EmergencyScenario) -> bool {
        self.scenario_type == other.scenario_type && self.severity == other.severity
    }
}

// ========== REFERENCE DATA ==========

/// Airport operating hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperatingHours {
    /// Open around the clock
    TwentyFourSeven,
    /// Open between two UTC hours (close may wrap past midnight)
    Limited { open_utc: u8, close_utc: u8 },
}

impl OperatingHours {
    pub fn is_24_7(&self) -> bool {
        matches!(self, OperatingHours::TwentyFourSeven)
    }
}

/// Geocoded airport reference record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub elevation_ft: f64,
    pub runway_length_ft: f64,
    #[serde(default)]
    pub medical_facilities: bool,
    #[serde(default)]
    pub fire_rescue: bool,
    #[serde(default)]
    pub maintenance: bool,
    pub operating_hours: OperatingHours,
    #[serde(default)]
    pub fuel_available: bool,
    /// Current adverse weather at the field, if reported
    #[serde(default)]
    pub weather: Option<WeatherSeverity>,
}

impl Airport {
    /// Records with unusable coordinates or runway data are never offered.
    pub fn is_well_formed(&self) -> bool {
        !self.code.trim().is_empty()
            && crate::spatial::is_valid_coordinate(self.lat, self.lon)
            && self.runway_length_ft.is_finite()
            && self.runway_length_ft > 0.0
    }

    pub fn capabilities(&self) -> AirportCapabilities {
        AirportCapabilities {
            medical_facilities: self.medical_facilities,
            fire_rescue: self.fire_rescue,
            maintenance: self.maintenance,
            twenty_four_seven: self.operating_hours.is_24_7(),
            fuel_available: self.fuel_available,
        }
    }
}

/// Per aircraft-type performance constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftProfile {
    pub aircraft_type: String,
    pub cruise_speed_kts: f64,
    pub fuel_burn_kg_per_hr: f64,
    pub max_range_nm: f64,
    pub min_runway_ft: f64,
    /// Direct operating cost per block hour
    pub hourly_operating_cost: f64,
}

// ========== DIVERSION CANDIDATES ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportCapabilities {
    pub medical_facilities: bool,
    pub fire_rescue: bool,
    pub maintenance: bool,
    pub twenty_four_seven: bool,
    pub fuel_available: bool,
}

/// A feasible diversion airport with computed distance, time and fuel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversionCandidate {
    pub airport: Airport,
    pub distance_nm: f64,
    pub flight_time_min: f64,
    pub fuel_required_kg: f64,
    pub capabilities: AirportCapabilities,
}

// ========== DECISION OPTIONS ==========

/// Identifier of a decision option.
///
/// Serialized as `continue`, `hold` or `divert:<CODE>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OptionId {
    Continue,
    Hold,
    Divert(String),
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionId::Continue => f.write_str("continue"),
            OptionId::Hold => f.write_str("hold"),
            OptionId::Divert(code) => write!(f, "divert:{code}"),
        }
    }
}

impl FromStr for OptionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "continue" => Ok(OptionId::Continue),
            "hold" => Ok(OptionId::Hold),
            other => match other.strip_prefix("divert:") {
                Some(code) if !code.trim().is_empty() => {
                    Ok(OptionId::Divert(code.trim().to_uppercase()))
                }
                _ => Err(format!("unrecognised option id '{other}'")),
            },
        }
    }
}

impl TryFrom<String> for OptionId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OptionId> for String {
    fn from(value: OptionId) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Minimal,
    Moderate,
    Significant,
    Severe,
}

/// Consequence vector of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsequenceProfile {
    pub fuel: ImpactLevel,
    pub passengers: ImpactLevel,
    pub crew: ImpactLevel,
    pub operational: ImpactLevel,
}

/// A scored course of action offered to the decision maker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub id: OptionId,
    pub title: String,
    pub risk_level: RiskLevel,
    /// Estimated cost in USD
    pub cost_impact: f64,
    /// Minutes until the aircraft is on the ground (or out of the hold)
    pub time_impact_min: f64,
    pub safety_score: f64,
    pub feasibility: f64,
    pub composite_score: f64,
    /// Distance flown to execute the option
    pub distance_nm: f64,
    pub fuel_required_kg: f64,
    pub consequences: ConsequenceProfile,
    pub requirements: Vec<String>,
}

// ========== DECISION CONTEXT ==========

/// Parties that must be involved in the decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeholderFlags {
    pub crew: bool,
    pub operations: bool,
    pub atc: bool,
    pub medical: bool,
    pub maintenance: bool,
    pub security: bool,
}

/// Constraints that shaped the option list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintFlags {
    pub time_critical: bool,
    pub diversion_required: bool,
    pub fuel_critical: bool,
    pub weather_adverse: bool,
    pub no_feasible_diversion: bool,
}

/// Degraded conditions noted while building a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextNotice {
    /// Diversion was wanted but no airport passed the filters
    NoFeasibleCandidates,
    /// The filed destination is not in the airport directory
    DestinationUnknown,
}

/// A ranked set of options awaiting exactly one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionContext {
    pub id: Uuid,
    pub flight_id: String,
    pub created_at: DateTime<Utc>,
    pub flight: FlightState,
    pub scenario: EmergencyScenario,
    /// Best first
    pub options: Vec<DecisionOption>,
    pub time_to_decision_s: u32,
    pub stakeholders: StakeholderFlags,
    pub constraints: ConstraintFlags,
    pub notices: Vec<ContextNotice>,
}

impl DecisionContext {
    pub fn option(&self, id: &OptionId) -> Option<&DecisionOption> {
        self.options.iter().find(|option| &option.id == id)
    }

    pub fn best(&self) -> Option<&DecisionOption> {
        self.options.first()
    }

    /// Seconds left in the decision window (zero once elapsed).
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - self.created_at).num_seconds();
        (i64::from(self.time_to_decision_s) - elapsed).max(0)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.seconds_remaining(now) == 0
    }
}

// ========== DECISION OUTCOME ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecidedBy {
    Crew,
    Operations,
    Ai,
    Collaborative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyOutcome {
    Poor,
    Acceptable,
    Good,
    Excellent,
}

impl SafetyOutcome {
    /// One grade lower, saturating at `Poor`.
    pub fn downgrade(self) -> Self {
        match self {
            SafetyOutcome::Excellent => SafetyOutcome::Good,
            SafetyOutcome::Good => SafetyOutcome::Acceptable,
            SafetyOutcome::Acceptable | SafetyOutcome::Poor => SafetyOutcome::Poor,
        }
    }
}

/// Immutable record of a decision and its (sampled) result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub id: Uuid,
    pub context_id: Uuid,
    pub flight_id: String,
    pub scenario: EmergencyScenario,
    pub option: DecisionOption,
    /// Rank of the chosen option in its context (0 = top)
    pub option_rank: usize,
    pub decided_by: DecidedBy,
    pub response_time_s: f64,
    pub time_to_decision_s: u32,
    pub confidence: f64,
    pub estimated_cost: f64,
    pub actual_cost: f64,
    pub estimated_time_min: f64,
    pub actual_time_min: f64,
    pub safety_outcome: SafetyOutcome,
    pub lessons: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate performance over the full decision history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_decisions: usize,
    pub mean_response_time_s: f64,
    /// Share of outcomes graded excellent or good, in percent
    pub pct_excellent_or_good: f64,
    pub mean_abs_cost_variance: f64,
    pub mean_confidence: f64,
}
