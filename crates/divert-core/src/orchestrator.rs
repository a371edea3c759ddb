//! Decision orchestration for a single flight.
//!
//! Owns the decision lifecycle `Idle -> ContextActive -> Decided -> Archived`:
//! builds ranked decision contexts from classifier output, accepts exactly one
//! decision per context, records the outcome and keeps aggregate metrics over
//! the full history.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::candidates::generate_candidates;
use crate::classifier::classify_emergency;
use crate::error::DecisionError;
use crate::models::{
    ConstraintFlags, ContextNotice, DecidedBy, DecisionContext, DecisionOption, DecisionOutcome,
    EmergencyScenario, EmergencyType, FlightState, OptionId, PerformanceMetrics, SafetyOutcome,
    Severity, SideSignals, StakeholderFlags,
};
use crate::policy::DecisionPolicy;
use crate::reference::{AircraftPerformanceTable, AirportDirectory};
use crate::sampling::OutcomeSampler;
use crate::scoring::{score_options, ScoringContext};
use crate::spatial::haversine_distance_nm;

/// Replaced context ids remembered for `StaleContext` rejections.
const SUPERSEDED_MEMORY: usize = 256;

/// Default diversion search radius.
pub const DEFAULT_SEARCH_RADIUS_NM: f64 = 400.0;

/// Lifecycle phase of a flight's decision process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPhase {
    Idle,
    ContextActive,
    Decided,
    Archived,
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No emergency detected
    ClassificationSkipped,
    /// Emergency cleared; the undecided context (if any) was dropped
    Cleared { dropped: Option<Uuid> },
    /// A scenario exists but does not warrant a decision
    NoDecisionRequired,
    ContextBuilt(Uuid),
    ContextReplaced { previous: Uuid, current: Uuid },
    ContextRetained(Uuid),
    /// The current situation was already decided in this context
    AlreadyDecided(Uuid),
    /// Context build failed this cycle; retried next tick
    BuildFailed(DecisionError),
}

/// Read-only inputs shared by every flight's orchestrator.
#[derive(Debug, Clone)]
pub struct DecisionResources {
    pub policy: Arc<DecisionPolicy>,
    pub airports: Arc<AirportDirectory>,
    pub aircraft: Arc<AircraftPerformanceTable>,
    pub search_radius_nm: f64,
}

impl DecisionResources {
    pub fn new(
        policy: DecisionPolicy,
        airports: AirportDirectory,
        aircraft: AircraftPerformanceTable,
    ) -> Self {
        Self {
            policy: Arc::new(policy),
            airports: Arc::new(airports),
            aircraft: Arc::new(aircraft),
            search_radius_nm: DEFAULT_SEARCH_RADIUS_NM,
        }
    }

    /// Default policy with the built-in reference tables.
    pub fn builtin() -> Self {
        Self::new(
            DecisionPolicy::default(),
            AirportDirectory::builtin(),
            AircraftPerformanceTable::builtin(),
        )
    }

    pub fn with_search_radius(mut self, search_radius_nm: f64) -> Self {
        self.search_radius_nm = search_radius_nm;
        self
    }
}

/// Append-only decision history with metrics over all entries.
#[derive(Debug, Clone, Default)]
pub struct DecisionHistory {
    outcomes: Vec<DecisionOutcome>,
    metrics: PerformanceMetrics,
}

impl DecisionHistory {
    pub fn record(&mut self, outcome: DecisionOutcome) {
        self.outcomes.push(outcome);
        self.metrics = compute_metrics(&self.outcomes);
    }

    pub fn outcomes(&self) -> &[DecisionOutcome] {
        &self.outcomes
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics
    }

    pub fn find(&self, context_id: Uuid) -> Option<&DecisionOutcome> {
        self.outcomes.iter().find(|o| o.context_id == context_id)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Aggregate metrics recomputed from the full history.
pub fn compute_metrics(outcomes: &[DecisionOutcome]) -> PerformanceMetrics {
    if outcomes.is_empty() {
        return PerformanceMetrics::default();
    }
    let n = outcomes.len() as f64;
    let good = outcomes
        .iter()
        .filter(|o| o.safety_outcome >= SafetyOutcome::Good)
        .count() as f64;

    PerformanceMetrics {
        total_decisions: outcomes.len(),
        mean_response_time_s: outcomes.iter().map(|o| o.response_time_s).sum::<f64>() / n,
        pct_excellent_or_good: good / n * 100.0,
        mean_abs_cost_variance: outcomes
            .iter()
            .map(|o| (o.actual_cost - o.estimated_cost).abs())
            .sum::<f64>()
            / n,
        mean_confidence: outcomes.iter().map(|o| o.confidence).sum::<f64>() / n,
    }
}

/// Decision authority for one flight.
pub struct DecisionOrchestrator {
    flight_id: String,
    resources: DecisionResources,
    sampler: Box<dyn OutcomeSampler>,
    phase: DecisionPhase,
    /// Undecided context, if any
    active: Option<DecisionContext>,
    /// Most recently decided context
    last_decided: Option<DecisionContext>,
    decided_ids: HashSet<Uuid>,
    superseded: VecDeque<Uuid>,
    history: DecisionHistory,
}

impl DecisionOrchestrator {
    pub fn new(
        flight_id: impl Into<String>,
        resources: DecisionResources,
        sampler: Box<dyn OutcomeSampler>,
    ) -> Self {
        Self {
            flight_id: flight_id.into(),
            resources,
            sampler,
            phase: DecisionPhase::Idle,
            active: None,
            last_decided: None,
            decided_ids: HashSet::new(),
            superseded: VecDeque::new(),
            history: DecisionHistory::default(),
        }
    }

    pub fn flight_id(&self) -> &str {
        &self.flight_id
    }

    pub fn phase(&self) -> DecisionPhase {
        self.phase
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.resources.policy
    }

    pub fn active_context(&self) -> Option<&DecisionContext> {
        self.active.as_ref()
    }

    pub fn last_decided(&self) -> Option<&DecisionContext> {
        self.last_decided.as_ref()
    }

    /// Classify without touching orchestrator state.
    pub fn classify(&self, flight: &FlightState, signals: &SideSignals) -> Option<EmergencyScenario> {
        classify_emergency(flight, signals, &self.resources.policy)
    }

    /// Re-evaluate the flight and (re)generate the decision context when
    /// conditions warrant one. Never fails: build errors are reported in the
    /// returned outcome and retried on the next tick.
    pub fn tick(&mut self, flight: &FlightState, signals: &SideSignals) -> TickOutcome {
        let Some(scenario) = self.classify(flight, signals) else {
            return self.clear();
        };

        if !(scenario.requires_immediate || flight.has_decision_warning()) {
            return match self.drop_active("no longer requires a decision") {
                Some(dropped) => TickOutcome::Cleared {
                    dropped: Some(dropped),
                },
                None => TickOutcome::NoDecisionRequired,
            };
        }

        if let Some(active) = &self.active {
            let previous = active.id;
            if active.scenario.same_situation(&scenario) {
                return TickOutcome::ContextRetained(previous);
            }
            return match self.generate_context(flight, &scenario) {
                Ok(context) => TickOutcome::ContextReplaced {
                    previous,
                    current: context.id,
                },
                Err(err) => self.build_failed(err),
            };
        }

        if let Some(decided) = &self.last_decided {
            if decided.scenario.same_situation(&scenario) {
                return TickOutcome::AlreadyDecided(decided.id);
            }
        }

        match self.generate_context(flight, &scenario) {
            Ok(context) => TickOutcome::ContextBuilt(context.id),
            Err(err) => self.build_failed(err),
        }
    }

    /// Build a context and install it as the flight's only active context,
    /// replacing (and invalidating) any undecided one.
    pub fn generate_context(
        &mut self,
        flight: &FlightState,
        scenario: &EmergencyScenario,
    ) -> Result<DecisionContext, DecisionError> {
        let context = self.build_context(flight, scenario)?;

        if let Some(previous) = self.active.replace(context.clone()) {
            tracing::info!(
                "Flight {}: context {} superseded by {}",
                self.flight_id,
                previous.id,
                context.id
            );
            self.remember_superseded(previous.id);
        }
        self.phase = DecisionPhase::ContextActive;

        tracing::info!(
            "Flight {}: {} {} context {} with {} options, window {}s",
            self.flight_id,
            scenario.severity,
            scenario.scenario_type,
            context.id,
            context.options.len(),
            context.time_to_decision_s
        );
        Ok(context)
    }

    /// Build a ranked context without installing it. Deterministic apart from
    /// the context id and timestamp.
    pub fn build_context(
        &self,
        flight: &FlightState,
        scenario: &EmergencyScenario,
    ) -> Result<DecisionContext, DecisionError> {
        let resources = &self.resources;
        let policy = resources.policy.as_ref();
        let profile = resources
            .aircraft
            .get(&flight.aircraft_type)
            .ok_or_else(|| DecisionError::UnknownAircraftType(flight.aircraft_type.clone()))?;

        let candidates = generate_candidates(
            &flight.position,
            profile,
            &resources.airports,
            resources.search_radius_nm,
            flight.destination.as_deref(),
            policy,
        );

        let mut notices = Vec::new();
        if candidates.is_empty() {
            if scenario.diversion_required {
                tracing::warn!(
                    "Flight {}: diversion required but no feasible candidates within {:.0}nm",
                    self.flight_id,
                    resources.search_radius_nm
                );
            }
            notices.push(ContextNotice::NoFeasibleCandidates);
        }

        let destination = match flight.destination.as_deref() {
            Some(code) => match resources.airports.get(code) {
                Some(airport) if airport.is_well_formed() => {
                    let distance_nm = haversine_distance_nm(
                        flight.position.lat,
                        flight.position.lon,
                        airport.lat,
                        airport.lon,
                    );
                    Some((airport, distance_nm))
                }
                _ => {
                    tracing::warn!(
                        "Flight {}: destination {} not in airport directory",
                        self.flight_id,
                        code
                    );
                    notices.push(ContextNotice::DestinationUnknown);
                    None
                }
            },
            None => None,
        };

        let scoring = ScoringContext {
            flight,
            scenario,
            profile,
            policy,
        };
        let options = score_options(&candidates, destination, &scoring);
        if options.is_empty() {
            return Err(DecisionError::NoOptions(self.flight_id.clone()));
        }

        Ok(DecisionContext {
            id: Uuid::new_v4(),
            flight_id: self.flight_id.clone(),
            created_at: Utc::now(),
            flight: flight.clone(),
            scenario: scenario.clone(),
            options,
            time_to_decision_s: policy.decision_window(scenario),
            stakeholders: stakeholders_for(scenario),
            constraints: ConstraintFlags {
                time_critical: scenario.severity == Severity::Critical,
                diversion_required: scenario.diversion_required,
                fuel_critical: scenario.scenario_type == EmergencyType::Fuel
                    || flight.fuel_remaining_kg < policy.fuel_floor_kg,
                weather_adverse: scenario.scenario_type == EmergencyType::Weather,
                no_feasible_diversion: candidates.is_empty(),
            },
            notices,
        })
    }

    /// Record the single decision for `context_id`.
    pub fn submit_decision(
        &mut self,
        context_id: Uuid,
        option_id: &OptionId,
        decided_by: DecidedBy,
        response_time_s: f64,
    ) -> Result<DecisionOutcome, DecisionError> {
        if self.decided_ids.contains(&context_id) {
            return Err(DecisionError::ContextAlreadyDecided(context_id));
        }
        if self.superseded.contains(&context_id) {
            return Err(DecisionError::StaleContext(context_id));
        }
        let Some(active) = self.active.as_ref() else {
            return Err(DecisionError::NoActiveContext(self.flight_id.clone()));
        };
        if active.id != context_id {
            return Err(DecisionError::UnknownContext(context_id));
        }
        let Some(rank) = active.options.iter().position(|o| &o.id == option_id) else {
            return Err(DecisionError::InvalidOption {
                context_id,
                option_id: option_id.clone(),
            });
        };
        let Some(context) = self.active.take() else {
            return Err(DecisionError::NoActiveContext(self.flight_id.clone()));
        };

        self.phase = DecisionPhase::Decided;
        let outcome = self.evaluate_outcome(&context, rank, decided_by, response_time_s);
        tracing::info!(
            "Flight {}: context {} decided by {:?}: {} (confidence {:.2}, {:?})",
            self.flight_id,
            context.id,
            decided_by,
            outcome.option.id,
            outcome.confidence,
            outcome.safety_outcome
        );

        self.decided_ids.insert(context.id);
        self.last_decided = Some(context);
        self.history.record(outcome.clone());
        self.phase = DecisionPhase::Archived;
        Ok(outcome)
    }

    pub fn history(&self) -> (&[DecisionOutcome], PerformanceMetrics) {
        (self.history.outcomes(), self.history.metrics())
    }

    pub fn decision_history(&self) -> &DecisionHistory {
        &self.history
    }

    fn clear(&mut self) -> TickOutcome {
        self.last_decided = None;
        match self.drop_active("emergency cleared") {
            Some(dropped) => TickOutcome::Cleared {
                dropped: Some(dropped),
            },
            None if self.phase != DecisionPhase::Idle => {
                self.phase = DecisionPhase::Idle;
                TickOutcome::Cleared { dropped: None }
            }
            None => TickOutcome::ClassificationSkipped,
        }
    }

    /// Drop the undecided context, if any, so its id turns stale.
    fn drop_active(&mut self, reason: &str) -> Option<Uuid> {
        let context = self.active.take()?;
        tracing::info!(
            "Flight {}: {}, dropping context {}",
            self.flight_id,
            reason,
            context.id
        );
        self.remember_superseded(context.id);
        self.phase = DecisionPhase::Idle;
        Some(context.id)
    }

    fn build_failed(&self, err: DecisionError) -> TickOutcome {
        tracing::error!(
            "Flight {}: failed to build decision context: {}",
            self.flight_id,
            err
        );
        TickOutcome::BuildFailed(err)
    }

    fn remember_superseded(&mut self, id: Uuid) {
        if self.superseded.len() >= SUPERSEDED_MEMORY {
            self.superseded.pop_front();
        }
        self.superseded.push_back(id);
    }

    fn evaluate_outcome(
        &mut self,
        context: &DecisionContext,
        rank: usize,
        decided_by: DecidedBy,
        response_time_s: f64,
    ) -> DecisionOutcome {
        let option = context.options[rank].clone();
        let response_time_s = if response_time_s.is_finite() {
            response_time_s.max(0.0)
        } else {
            0.0
        };
        let window = f64::from(context.time_to_decision_s);
        let sampled = self.sampler.sample(&option);

        let confidence = decision_confidence(&option, response_time_s, window, decided_by);
        let overrun = response_time_s > window;
        let mut safety_outcome = grade_safety(option.safety_score);
        if overrun {
            safety_outcome = safety_outcome.downgrade();
        }

        let mut lessons = Vec::new();
        if overrun {
            lessons.push(format!(
                "Decision took {:.0}s, exceeding the {:.0}s window by {:.0}s",
                response_time_s,
                window,
                response_time_s - window
            ));
        }
        if option.feasibility < 60.0 {
            lessons.push(format!(
                "Chosen option had tight margins (feasibility {:.0}); review fuel planning",
                option.feasibility
            ));
        }
        if option.cost_impact > 0.0 {
            let variance = (sampled.actual_cost - option.cost_impact) / option.cost_impact;
            if variance.abs() > 0.10 {
                lessons.push(format!(
                    "Actual cost deviated {:+.0}% from estimate",
                    variance * 100.0
                ));
            }
        }
        if rank > 0 {
            if let Some(best) = context.best() {
                lessons.push(format!(
                    "Top-ranked option {} ({:.1}) was not chosen; recorded choice scored {:.1}",
                    best.id, best.composite_score, option.composite_score
                ));
            }
        }

        DecisionOutcome {
            id: Uuid::new_v4(),
            context_id: context.id,
            flight_id: self.flight_id.clone(),
            scenario: context.scenario.clone(),
            option_rank: rank,
            decided_by,
            response_time_s,
            time_to_decision_s: context.time_to_decision_s,
            confidence,
            estimated_cost: option.cost_impact,
            actual_cost: sampled.actual_cost,
            estimated_time_min: option.time_impact_min,
            actual_time_min: sampled.actual_time_min,
            safety_outcome,
            lessons,
            recorded_at: Utc::now(),
            option,
        }
    }
}

impl std::fmt::Debug for DecisionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionOrchestrator")
            .field("flight_id", &self.flight_id)
            .field("phase", &self.phase)
            .field("active", &self.active.as_ref().map(|c| c.id))
            .field("sampling", &self.sampler.mode())
            .field("decisions", &self.history.len())
            .finish()
    }
}

fn stakeholders_for(scenario: &EmergencyScenario) -> StakeholderFlags {
    StakeholderFlags {
        crew: true,
        operations: true,
        atc: scenario.requires_immediate || scenario.diversion_required,
        medical: scenario.scenario_type == EmergencyType::Medical,
        maintenance: scenario.scenario_type == EmergencyType::Technical,
        security: scenario.scenario_type == EmergencyType::Security,
    }
}

fn decision_confidence(
    option: &DecisionOption,
    response_time_s: f64,
    window_s: f64,
    decided_by: DecidedBy,
) -> f64 {
    let score_part = 0.6 * (option.composite_score / 100.0);
    let timeliness = if window_s > 0.0 {
        (1.0 - response_time_s / window_s).max(0.0)
    } else {
        0.0
    };
    let authority = match decided_by {
        DecidedBy::Collaborative => 0.10,
        DecidedBy::Crew => 0.08,
        DecidedBy::Operations => 0.06,
        DecidedBy::Ai => 0.05,
    };
    (score_part + 0.3 * timeliness + authority).clamp(0.0, 1.0)
}

fn grade_safety(safety_score: f64) -> SafetyOutcome {
    if safety_score >= 85.0 {
        SafetyOutcome::Excellent
    } else if safety_score >= 70.0 {
        SafetyOutcome::Good
    } else if safety_score >= 50.0 {
        SafetyOutcome::Acceptable
    } else {
        SafetyOutcome::Poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Airport, MedicalAlert, OperatingHours, Position, Subsystem, SystemWarning, WarningLevel,
        WeatherSeverity,
    };
    use crate::sampling::{EstimateSampler, SimulatedVariance};
    use crate::spatial::offset_by_bearing_nm;

    const ORIGIN: (f64, f64) = (50.0, -30.0);

    fn field(code: &str, distance_nm: f64, bearing_deg: f64, medical: bool, runway_ft: f64) -> Airport {
        let (lat, lon) = offset_by_bearing_nm(ORIGIN.0, ORIGIN.1, distance_nm, bearing_deg);
        Airport {
            code: code.into(),
            name: format!("{code} Airport"),
            lat,
            lon,
            elevation_ft: 0.0,
            runway_length_ft: runway_ft,
            medical_facilities: medical,
            fire_rescue: true,
            maintenance: true,
            operating_hours: OperatingHours::TwentyFourSeven,
            fuel_available: true,
            weather: None,
        }
    }

    fn resources(airports: Vec<Airport>) -> DecisionResources {
        DecisionResources::new(
            DecisionPolicy::default(),
            AirportDirectory::new(airports).unwrap(),
            AircraftPerformanceTable::builtin(),
        )
    }

    fn standard_resources() -> DecisionResources {
        resources(vec![
            field("MEDI", 120.0, 0.0, true, 11_000.0),
            field("DEST", 1_500.0, 90.0, true, 12_000.0),
        ])
    }

    fn orchestrator(resources: DecisionResources) -> DecisionOrchestrator {
        DecisionOrchestrator::new("UA901", resources, Box::new(EstimateSampler))
    }

    fn flight(fuel_remaining_kg: f64) -> FlightState {
        FlightState {
            flight_id: "UA901".into(),
            aircraft_type: "B777".into(),
            position: Position::new(ORIGIN.0, ORIGIN.1, 37_000.0),
            airspeed_kts: 490.0,
            fuel_remaining_kg,
            declared_emergency: None,
            system_warnings: Vec::new(),
            passengers: 301,
            crew: 14,
            destination: Some("DEST".into()),
            timestamp: Utc::now(),
        }
    }

    fn medical(severity: Severity) -> SideSignals {
        SideSignals {
            medical_alert: Some(MedicalAlert {
                severity,
                description: "unresponsive passenger".into(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn medical_critical_prefers_nearby_medical_airport() {
        let mut orch = orchestrator(standard_resources());
        let state = flight(50_000.0);

        let outcome = orch.tick(&state, &medical(Severity::Critical));
        assert!(matches!(outcome, TickOutcome::ContextBuilt(_)));
        assert_eq!(orch.phase(), DecisionPhase::ContextActive);

        let context = orch.active_context().unwrap();
        assert_eq!(context.time_to_decision_s, 300);
        let best = context.best().unwrap();
        assert_eq!(best.id, OptionId::Divert("MEDI".into()));
        assert_eq!(best.feasibility, 100.0);
        assert!(best.fuel_required_kg < 0.6 * 50_000.0);
        assert!(context.stakeholders.medical);
        assert!(context.constraints.time_critical);
    }

    #[test]
    fn options_are_sorted_without_inversions() {
        let airports = (0..7)
            .map(|i| field(&format!("AP{i:02}"), 60.0 + 45.0 * i as f64, 50.0 * i as f64, i % 2 == 0, 10_500.0))
            .collect();
        let orch = orchestrator(resources(airports));
        let state = flight(60_000.0);
        let scenario = orch.classify(&state, &medical(Severity::High)).unwrap();
        let context = orch.build_context(&state, &scenario).unwrap();
        for pair in context.options.windows(2) {
            assert!(pair[0].composite_score >= pair[1].composite_score);
        }
    }

    #[test]
    fn zero_candidates_falls_back_to_continue_and_hold() {
        let mut orch = orchestrator(resources(vec![
            field("SHRT", 80.0, 0.0, true, 4_000.0),
            field("DEST", 1_500.0, 90.0, true, 12_000.0),
        ]));
        let mut state = flight(50_000.0);
        state.system_warnings.push(SystemWarning::new(
            Subsystem::Engine,
            WarningLevel::Warning,
            "ENG 1 FAIL",
        ));

        let outcome = orch.tick(&state, &SideSignals::default());
        assert!(matches!(outcome, TickOutcome::ContextBuilt(_)));
        let context = orch.active_context().unwrap();
        let ids: HashSet<OptionId> = context.options.iter().map(|o| o.id.clone()).collect();
        assert_eq!(ids, HashSet::from([OptionId::Continue, OptionId::Hold]));
        assert!(context.notices.contains(&ContextNotice::NoFeasibleCandidates));
        assert!(context.constraints.no_feasible_diversion);
    }

    #[test]
    fn build_context_is_deterministic() {
        let orch = orchestrator(standard_resources());
        let state = flight(50_000.0);
        let scenario = orch.classify(&state, &medical(Severity::High)).unwrap();

        let first = orch.build_context(&state, &scenario).unwrap();
        let second = orch.build_context(&state, &scenario).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.options, second.options);
    }

    #[test]
    fn decision_window_shrinks_with_severity() {
        let orch = orchestrator(standard_resources());
        let state = flight(50_000.0);
        let windows: Vec<u32> = [Severity::Low, Severity::Medium, Severity::High, Severity::Critical]
            .into_iter()
            .map(|severity| {
                let scenario = orch.classify(&state, &medical(severity)).unwrap();
                orch.build_context(&state, &scenario).unwrap().time_to_decision_s
            })
            .collect();
        assert_eq!(windows, vec![1_200, 1_200, 600, 300]);
        assert!(windows.iter().all(|w| *w > 0));
        assert!(windows.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn second_submission_is_rejected() {
        let mut orch = orchestrator(standard_resources());
        let state = flight(50_000.0);
        orch.tick(&state, &medical(Severity::Critical));
        let context = orch.active_context().unwrap().clone();
        let best = context.best().unwrap().id.clone();

        let outcome = orch
            .submit_decision(context.id, &best, DecidedBy::Crew, 45.0)
            .unwrap();
        assert_eq!(outcome.context_id, context.id);
        assert_eq!(orch.phase(), DecisionPhase::Archived);

        let err = orch
            .submit_decision(context.id, &OptionId::Hold, DecidedBy::Operations, 50.0)
            .unwrap_err();
        assert_eq!(err, DecisionError::ContextAlreadyDecided(context.id));
        assert_eq!(orch.history().0.len(), 1);
    }

    #[test]
    fn invalid_option_leaves_context_active() {
        let mut orch = orchestrator(standard_resources());
        let state = flight(50_000.0);
        orch.tick(&state, &medical(Severity::Critical));
        let context_id = orch.active_context().unwrap().id;

        let err = orch
            .submit_decision(context_id, &OptionId::Divert("ZZZZ".into()), DecidedBy::Crew, 10.0)
            .unwrap_err();
        assert!(matches!(err, DecisionError::InvalidOption { .. }));
        assert_eq!(orch.phase(), DecisionPhase::ContextActive);
        assert_eq!(orch.active_context().unwrap().id, context_id);
    }

    #[test]
    fn superseded_context_is_stale() {
        let mut orch = orchestrator(standard_resources());
        let state = flight(50_000.0);

        let TickOutcome::ContextBuilt(first) = orch.tick(&state, &medical(Severity::High)) else {
            panic!("expected a new context");
        };
        assert_eq!(
            orch.tick(&state, &medical(Severity::High)),
            TickOutcome::ContextRetained(first)
        );

        let TickOutcome::ContextReplaced { previous, current } =
            orch.tick(&state, &medical(Severity::Critical))
        else {
            panic!("expected escalation to replace the context");
        };
        assert_eq!(previous, first);
        assert_ne!(current, first);

        let err = orch
            .submit_decision(first, &OptionId::Hold, DecidedBy::Crew, 5.0)
            .unwrap_err();
        assert_eq!(err, DecisionError::StaleContext(first));
    }

    #[test]
    fn decided_situation_is_not_reopened_until_it_changes() {
        let mut orch = orchestrator(standard_resources());
        let state = flight(50_000.0);
        let TickOutcome::ContextBuilt(id) = orch.tick(&state, &medical(Severity::High)) else {
            panic!("expected a new context");
        };
        orch.submit_decision(id, &OptionId::Hold, DecidedBy::Crew, 30.0).unwrap();

        assert_eq!(orch.tick(&state, &medical(Severity::High)), TickOutcome::AlreadyDecided(id));
        assert!(matches!(
            orch.tick(&state, &medical(Severity::Critical)),
            TickOutcome::ContextBuilt(_)
        ));
    }

    #[test]
    fn cleared_emergency_returns_to_idle() {
        let mut orch = orchestrator(standard_resources());
        let state = flight(50_000.0);
        let TickOutcome::ContextBuilt(id) = orch.tick(&state, &medical(Severity::High)) else {
            panic!("expected a new context");
        };
        assert_eq!(
            orch.tick(&state, &SideSignals::default()),
            TickOutcome::Cleared { dropped: Some(id) }
        );
        assert_eq!(orch.phase(), DecisionPhase::Idle);
        assert!(orch.active_context().is_none());
        assert_eq!(
            orch.submit_decision(id, &OptionId::Hold, DecidedBy::Crew, 1.0),
            Err(DecisionError::StaleContext(id))
        );
        assert_eq!(
            orch.tick(&state, &SideSignals::default()),
            TickOutcome::ClassificationSkipped
        );
    }

    #[test]
    fn deescalation_below_decision_threshold_drops_context() {
        let mut orch = orchestrator(standard_resources());
        let state = flight(50_000.0);
        let TickOutcome::ContextBuilt(id) = orch.tick(&state, &medical(Severity::Critical)) else {
            panic!("expected a new context");
        };

        assert_eq!(
            orch.tick(&state, &medical(Severity::Low)),
            TickOutcome::Cleared { dropped: Some(id) }
        );
        assert_eq!(orch.phase(), DecisionPhase::Idle);
        assert!(orch.active_context().is_none());
        assert_eq!(
            orch.submit_decision(id, &OptionId::Hold, DecidedBy::Crew, 1.0),
            Err(DecisionError::StaleContext(id))
        );
        assert_eq!(
            orch.tick(&state, &medical(Severity::Low)),
            TickOutcome::NoDecisionRequired
        );
    }

    #[test]
    fn deescalation_keeps_decided_situation() {
        let mut orch = orchestrator(standard_resources());
        let state = flight(50_000.0);
        let TickOutcome::ContextBuilt(id) = orch.tick(&state, &medical(Severity::High)) else {
            panic!("expected a new context");
        };
        orch.submit_decision(id, &OptionId::Hold, DecidedBy::Crew, 30.0).unwrap();

        assert_eq!(
            orch.tick(&state, &medical(Severity::Low)),
            TickOutcome::NoDecisionRequired
        );
        assert_eq!(orch.phase(), DecisionPhase::Archived);
        assert_eq!(orch.last_decided().map(|c| c.id), Some(id));
    }

    #[test]
    fn unissued_context_id_is_unknown_not_stale() {
        let mut orch = orchestrator(standard_resources());
        let state = flight(50_000.0);
        assert_eq!(
            orch.submit_decision(Uuid::new_v4(), &OptionId::Hold, DecidedBy::Crew, 1.0),
            Err(DecisionError::NoActiveContext("UA901".into()))
        );

        let TickOutcome::ContextBuilt(active) = orch.tick(&state, &medical(Severity::High)) else {
            panic!("expected a new context");
        };
        let foreign = Uuid::new_v4();
        assert_eq!(
            orch.submit_decision(foreign, &OptionId::Hold, DecidedBy::Crew, 1.0),
            Err(DecisionError::UnknownContext(foreign))
        );
        assert_eq!(orch.active_context().map(|c| c.id), Some(active));
    }

    #[test]
    fn low_severity_without_warning_needs_no_decision() {
        let mut orch = orchestrator(standard_resources());
        let state = flight(50_000.0);
        assert_eq!(
            orch.tick(&state, &medical(Severity::Low)),
            TickOutcome::NoDecisionRequired
        );
        assert_eq!(orch.phase(), DecisionPhase::Idle);

        let signals = SideSignals {
            weather: Some(WeatherSeverity::Severe),
            ..Default::default()
        };
        assert!(matches!(orch.tick(&state, &signals), TickOutcome::ContextBuilt(_)));
    }

    #[test]
    fn unknown_aircraft_fails_the_cycle_only() {
        let mut orch = orchestrator(standard_resources());
        let mut state = flight(50_000.0);
        state.aircraft_type = "C172".into();
        assert_eq!(
            orch.tick(&state, &medical(Severity::Critical)),
            TickOutcome::BuildFailed(DecisionError::UnknownAircraftType("C172".into()))
        );
        assert_eq!(orch.phase(), DecisionPhase::Idle);

        state.aircraft_type = "B777".into();
        assert!(matches!(
            orch.tick(&state, &medical(Severity::Critical)),
            TickOutcome::ContextBuilt(_)
        ));
    }

    #[test]
    fn unknown_destination_drops_continue_option() {
        let mut orch = orchestrator(standard_resources());
        let mut state = flight(50_000.0);
        state.destination = Some("NOWHERE".into());
        orch.tick(&state, &medical(Severity::Critical));
        let context = orch.active_context().unwrap();
        assert!(context.notices.contains(&ContextNotice::DestinationUnknown));
        assert!(context.option(&OptionId::Continue).is_none());
        assert!(context.option(&OptionId::Hold).is_some());
    }

    #[test]
    fn outcome_grading_and_metrics() {
        let mut orch = orchestrator(standard_resources());
        let state = flight(50_000.0);
        orch.tick(&state, &medical(Severity::Critical));
        let context = orch.active_context().unwrap().clone();
        let best = context.best().unwrap().clone();

        let outcome = orch
            .submit_decision(context.id, &best.id, DecidedBy::Collaborative, 60.0)
            .unwrap();
        assert_eq!(outcome.safety_outcome, SafetyOutcome::Excellent);
        assert_eq!(outcome.actual_cost, outcome.estimated_cost);
        let expected = 0.6 * best.composite_score / 100.0 + 0.3 * (1.0 - 60.0 / 300.0) + 0.10;
        assert!((outcome.confidence - expected.min(1.0)).abs() < 1e-9);
        assert!(outcome.lessons.is_empty(), "{:?}", outcome.lessons);

        // A late hold decision on a new situation is downgraded and noted.
        let mut escalated = state.clone();
        escalated.system_warnings.push(SystemWarning::new(
            Subsystem::Pressurization,
            WarningLevel::Warning,
            "CABIN ALT",
        ));
        let TickOutcome::ContextBuilt(second) =
            orch.tick(&escalated, &SideSignals::default())
        else {
            panic!("expected a new context");
        };
        let late = orch
            .submit_decision(second, &OptionId::Hold, DecidedBy::Ai, 400.0)
            .unwrap();
        assert_eq!(late.safety_outcome, SafetyOutcome::Poor);
        assert!(late.lessons.iter().any(|l| l.contains("exceeding")));
        assert!(late.lessons.iter().any(|l| l.contains("Top-ranked")));

        let (outcomes, metrics) = orch.history();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(metrics.total_decisions, 2);
        assert!((metrics.mean_response_time_s - 230.0).abs() < 1e-9);
        assert!((metrics.pct_excellent_or_good - 50.0).abs() < 1e-9);
        assert_eq!(metrics.mean_abs_cost_variance, 0.0);
    }

    #[test]
    fn simulated_outcomes_stay_near_estimate() {
        let mut orch = DecisionOrchestrator::new(
            "UA901",
            standard_resources(),
            Box::new(SimulatedVariance::new(Some(11))),
        );
        let state = flight(50_000.0);
        orch.tick(&state, &medical(Severity::Critical));
        let context = orch.active_context().unwrap().clone();
        let best = context.best().unwrap().id.clone();
        let outcome = orch
            .submit_decision(context.id, &best, DecidedBy::Crew, 20.0)
            .unwrap();
        let ratio = outcome.actual_cost / outcome.estimated_cost;
        assert!((0.849..=1.151).contains(&ratio));
    }
}
