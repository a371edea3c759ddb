pub mod candidates;
pub mod classifier;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod reference;
pub mod response;
pub mod sampling;
pub mod scoring;
pub mod spatial;

pub use candidates::{estimate_leg, generate_candidates, LegEstimate};
pub use classifier::classify_emergency;
pub use error::{DecisionError, ReferenceDataError};
pub use models::{
    AircraftProfile, Airport, AirportCapabilities, ConsequenceProfile, ConstraintFlags,
    ContextNotice, DecidedBy, DecisionContext, DecisionOption, DecisionOutcome,
    DiversionCandidate, EmergencyScenario, EmergencyType, FlightState, ImpactLevel, MedicalAlert,
    OperatingHours, OptionId, PerformanceMetrics, Position, RiskLevel, SafetyOutcome, Severity,
    SideSignals, StakeholderFlags, Subsystem, SystemWarning, WarningLevel, WeatherSeverity,
};
pub use orchestrator::{
    compute_metrics, DecisionHistory, DecisionOrchestrator, DecisionPhase, DecisionResources,
    TickOutcome, DEFAULT_SEARCH_RADIUS_NM,
};
pub use policy::{DecisionPolicy, DecisionWindows, ScenarioCompensation, ScoringWeights};
pub use reference::{AircraftPerformanceTable, AirportDirectory};
pub use response::{
    generate_response_plan, Communication, MessagePriority, PlannedAction, Recipient,
    ResourceRequirements, ResponsePlan,
};
pub use sampling::{sampler_for, EstimateSampler, OutcomeSampler, SampledOutcome, SamplingMode, SimulatedVariance};
pub use scoring::{
    composite_score, feasibility_score, rank_options, safety_score, score_options, ScoringContext,
};
pub use spatial::{haversine_distance, haversine_distance_nm};
