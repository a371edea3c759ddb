//! Decision context and decision submission handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::state::{AppState, StateError};
use divert_core::{
    DecidedBy, DecisionContext, DecisionError, DecisionOutcome, OptionId, PerformanceMetrics,
    ResponsePlan,
};

type ApiError = (StatusCode, Json<serde_json::Value>);

/// Active context with the live countdown.
#[derive(Debug, Serialize)]
pub struct ContextView {
    #[serde(flatten)]
    pub context: DecisionContext,
    pub seconds_remaining: i64,
}

impl From<DecisionContext> for ContextView {
    fn from(context: DecisionContext) -> Self {
        let seconds_remaining = context.seconds_remaining(Utc::now());
        Self {
            context,
            seconds_remaining,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub context_id: Uuid,
    pub option_id: OptionId,
    pub decided_by: DecidedBy,
    pub response_time_s: f64,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub outcome: DecisionOutcome,
    pub plan: ResponsePlan,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub flight_id: String,
    pub outcomes: Vec<DecisionOutcome>,
    pub metrics: PerformanceMetrics,
}

pub async fn get_context(
    State(state): State<Arc<AppState>>,
    Path(flight_id): Path<String>,
) -> Result<Json<ContextView>, ApiError> {
    match state.active_context(&flight_id) {
        Ok(Some(context)) => Ok(Json(context.into())),
        Ok(None) => Err(error_response(StateError::Decision(
            DecisionError::NoActiveContext(flight_id),
        ))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn regenerate_context(
    State(state): State<Arc<AppState>>,
    Path(flight_id): Path<String>,
) -> Result<(StatusCode, Json<ContextView>), ApiError> {
    state
        .regenerate_context(&flight_id)
        .map(|context| (StatusCode::CREATED, Json(context.into())))
        .map_err(error_response)
}

pub async fn submit_decision(
    State(state): State<Arc<AppState>>,
    Path(flight_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    if !request.response_time_s.is_finite() || request.response_time_s < 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "response_time_s must be a non-negative number" })),
        ));
    }

    let (outcome, plan) = state
        .submit_decision(
            &flight_id,
            request.context_id,
            &request.option_id,
            request.decided_by,
            request.response_time_s,
        )
        .map_err(error_response)?;
    Ok(Json(DecisionResponse { outcome, plan }))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(flight_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (outcomes, metrics) = state.history(&flight_id).map_err(error_response)?;
    Ok(Json(HistoryResponse {
        flight_id,
        outcomes,
        metrics,
    }))
}

pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path((flight_id, context_id)): Path<(String, Uuid)>,
) -> Result<Json<ResponsePlan>, StatusCode> {
    state
        .plan(&flight_id, context_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Map a state error to its HTTP status and JSON body.
pub fn error_response(error: StateError) -> ApiError {
    let (status, code) = match &error {
        StateError::UnknownFlight(_) => (StatusCode::NOT_FOUND, "unknown_flight"),
        StateError::InvalidTelemetry(_) => (StatusCode::BAD_REQUEST, "invalid_telemetry"),
        StateError::NoEmergency(_) => (StatusCode::CONFLICT, "no_emergency"),
        StateError::Decision(e) => match e {
            DecisionError::InvalidOption { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_option")
            }
            DecisionError::ContextAlreadyDecided(_) => (StatusCode::CONFLICT, "already_decided"),
            DecisionError::StaleContext(_) => (StatusCode::CONFLICT, "stale_context"),
            DecisionError::UnknownContext(_) => (StatusCode::NOT_FOUND, "unknown_context"),
            DecisionError::NoActiveContext(_) => (StatusCode::NOT_FOUND, "no_active_context"),
            DecisionError::UnknownAircraftType(_) => {
                (StatusCode::BAD_REQUEST, "unknown_aircraft_type")
            }
            DecisionError::NoOptions(_) => (StatusCode::INTERNAL_SERVER_ERROR, "no_options"),
        },
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {}", error);
    } else {
        tracing::debug!("Request rejected: {}", error);
    }
    (
        status,
        Json(serde_json::json!({ "error": error.to_string(), "code": code })),
    )
}
