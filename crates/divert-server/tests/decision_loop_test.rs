//! Decision loop integration tests.
//!
//! Drive `AppState` through loop ticks the way the running server does,
//! without binding a socket.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use divert_core::{
    DecidedBy, DecisionPhase, DecisionResources, FlightState, MedicalAlert, Position,
    SamplingMode, Severity, SideSignals, Subsystem, SystemWarning, WarningLevel,
};
use divert_server::config::Config;
use divert_server::loops::decision_loop::{run_decision_loop, run_tick};
use divert_server::state::AppState;
use tokio::sync::broadcast;

fn make_state() -> AppState {
    let config = Config {
        outcome_mode: SamplingMode::Estimate,
        tick_interval_ms: 50,
        ..Config::default()
    };
    AppState::new(config, DecisionResources::builtin())
}

fn make_flight(flight_id: &str) -> FlightState {
    FlightState {
        flight_id: flight_id.to_string(),
        aircraft_type: "B789".to_string(),
        position: Position::new(49.0, -45.0, 39_000.0),
        airspeed_kts: 485.0,
        fuel_remaining_kg: 48_000.0,
        declared_emergency: None,
        system_warnings: Vec::new(),
        passengers: 250,
        crew: 11,
        destination: Some("EINN".to_string()),
        timestamp: Utc::now(),
    }
}

fn medical(severity: Severity) -> SideSignals {
    SideSignals {
        medical_alert: Some(MedicalAlert {
            severity,
            description: "suspected stroke".to_string(),
        }),
        ..Default::default()
    }
}

#[test]
fn tick_builds_escalates_and_clears_contexts() {
    let state = make_state();
    state
        .ingest_telemetry(make_flight("AC870"), medical(Severity::High))
        .unwrap();

    let summary = run_tick(&state);
    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.contexts_built, 1);
    let first = state.active_context("AC870").unwrap().unwrap();
    assert_eq!(first.time_to_decision_s, 600);

    // Unchanged situation keeps the same context.
    let summary = run_tick(&state);
    assert_eq!(summary.contexts_built + summary.contexts_replaced, 0);
    assert_eq!(state.active_context("AC870").unwrap().unwrap().id, first.id);

    // Escalation replaces it.
    let mut flight = make_flight("AC870");
    flight.system_warnings.push(SystemWarning::new(
        Subsystem::Engine,
        WarningLevel::Warning,
        "ENG 1 OIL PRESS",
    ));
    state.ingest_telemetry(flight, medical(Severity::High)).unwrap();
    let summary = run_tick(&state);
    assert_eq!(summary.contexts_replaced, 1);
    let second = state.active_context("AC870").unwrap().unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(second.time_to_decision_s, 300);

    // All clear drops the undecided context.
    state
        .ingest_telemetry(make_flight("AC870"), SideSignals::default())
        .unwrap();
    let summary = run_tick(&state);
    assert_eq!(summary.cleared, 1);
    assert!(state.active_context("AC870").unwrap().is_none());
    assert_eq!(state.flight_summaries()[0].phase, DecisionPhase::Idle);
}

#[test]
fn flights_are_independent() {
    let state = make_state();
    state
        .ingest_telemetry(make_flight("LH400"), medical(Severity::Critical))
        .unwrap();
    state
        .ingest_telemetry(make_flight("LH401"), SideSignals::default())
        .unwrap();

    let summary = run_tick(&state);
    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.contexts_built, 1);

    let context = state.active_context("LH400").unwrap().unwrap();
    let best = context.best().unwrap().id.clone();
    state
        .submit_decision("LH400", context.id, &best, DecidedBy::Collaborative, 30.0)
        .unwrap();

    assert!(state.active_context("LH401").unwrap().is_none());
    assert!(state.history("LH401").unwrap().0.is_empty());
    assert_eq!(state.history("LH400").unwrap().1.total_decisions, 1);
}

#[test]
fn silent_flights_are_dropped() {
    let state = make_state();
    state
        .ingest_telemetry(make_flight("EI105"), medical(Severity::High))
        .unwrap();
    run_tick(&state);

    let later = Utc::now() + ChronoDuration::seconds(301);
    let dropped = state.drop_stale_flights(later, 300);
    assert_eq!(dropped, vec!["EI105".to_string()]);
    assert!(state.flight_ids().is_empty());
    assert!(state.active_context("EI105").is_err());
}

#[tokio::test]
async fn events_are_broadcast_to_subscribers() {
    let state = make_state();
    let mut rx = state.tx.subscribe();

    state
        .ingest_telemetry(make_flight("SK903"), medical(Severity::Critical))
        .unwrap();
    run_tick(&state);

    let msg = rx.recv().await.unwrap();
    assert_eq!(msg.flight_id, "SK903");
    let event: serde_json::Value = serde_json::from_str(&msg.payload).unwrap();
    assert_eq!(event["event"], "context_created");
    assert_eq!(event["context"]["flight_id"], "SK903");
}

#[tokio::test]
async fn loop_runs_until_shutdown() {
    let state = Arc::new(make_state());
    state
        .ingest_telemetry(make_flight("TP211"), medical(Severity::Critical))
        .unwrap();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(run_decision_loop(state.clone(), shutdown_rx));

    let mut built = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(25)).await;
        if matches!(state.active_context("TP211"), Ok(Some(_))) {
            built = true;
            break;
        }
    }
    assert!(built, "loop never built a context");

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop did not stop")
        .unwrap();
}
