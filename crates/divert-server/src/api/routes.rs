//! REST API routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::{decisions, ws};
use crate::config::Config;
use crate::state::{AppState, FlightSummary, StateError};
use divert_core::{
    AircraftProfile, Airport, DecisionPolicy, EmergencyScenario, FlightState, SideSignals,
};

/// Create the API router.
pub fn create_router(config: &Config) -> Router<Arc<AppState>> {
    tracing::debug!(
        "Building router (tick {}ms, search radius {:.0}nm)",
        config.tick_interval_ms,
        config.search_radius_nm
    );

    Router::new()
        .route("/v1/telemetry", post(receive_telemetry))
        .route("/v1/classify", post(classify))
        .route("/v1/flights", get(list_flights))
        .route(
            "/v1/flights/:flight_id/context",
            get(decisions::get_context).post(decisions::regenerate_context),
        )
        .route("/v1/flights/:flight_id/decisions", post(decisions::submit_decision))
        .route("/v1/flights/:flight_id/history", get(decisions::get_history))
        .route(
            "/v1/flights/:flight_id/plans/:context_id",
            get(decisions::get_plan),
        )
        .route("/v1/policy", get(get_policy))
        .route("/v1/airports", get(list_airports))
        .route("/v1/aircraft", get(list_aircraft))
        .route("/v1/ws", get(ws::ws_handler))
}

/// Telemetry frame: flight state plus side-channel signals.
#[derive(Debug, Deserialize)]
pub struct TelemetryRequest {
    pub flight: FlightState,
    #[serde(default)]
    pub signals: SideSignals,
}

async fn receive_telemetry(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TelemetryRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.ingest_telemetry(request.flight, request.signals) {
        Ok(()) => (StatusCode::ACCEPTED, Json(serde_json::json!({}))),
        Err(StateError::InvalidTelemetry(errors)) => bad_request(&errors),
        Err(e) => decisions::error_response(e),
    }
}

async fn classify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TelemetryRequest>,
) -> Result<Json<Option<EmergencyScenario>>, (StatusCode, Json<serde_json::Value>)> {
    let errors = request.flight.validate();
    if !errors.is_empty() {
        return Err(bad_request(&errors));
    }
    Ok(Json(state.classify(&request.flight, &request.signals)))
}

async fn list_flights(State(state): State<Arc<AppState>>) -> Json<Vec<FlightSummary>> {
    Json(state.flight_summaries())
}

async fn get_policy(State(state): State<Arc<AppState>>) -> Json<DecisionPolicy> {
    Json(state.resources().policy.as_ref().clone())
}

async fn list_airports(State(state): State<Arc<AppState>>) -> Json<Vec<Airport>> {
    Json(state.resources().airports.iter().cloned().collect())
}

async fn list_aircraft(State(state): State<Arc<AppState>>) -> Json<Vec<AircraftProfile>> {
    Json(state.resources().aircraft.iter().cloned().collect())
}

fn bad_request(errors: &[String]) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": "Invalid telemetry", "details": errors })),
    )
}
