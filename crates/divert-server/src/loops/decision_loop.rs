//! Periodic decision loop.
//!
//! Re-evaluates every tracked flight against its latest telemetry, so that
//! contexts appear, escalate and clear without waiting for a client request.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::interval;

use crate::state::AppState;
use divert_core::TickOutcome;

/// Counts from one pass over the tracked flights.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub evaluated: usize,
    pub contexts_built: usize,
    pub contexts_replaced: usize,
    pub cleared: usize,
    pub failures: usize,
    pub dropped: usize,
}

/// One pass: drop silent flights, then tick the rest.
pub fn run_tick(state: &AppState) -> TickSummary {
    let mut summary = TickSummary {
        dropped: state
            .drop_stale_flights(Utc::now(), state.config().flight_timeout_secs)
            .len(),
        ..TickSummary::default()
    };

    for flight_id in state.flight_ids() {
        let Some(outcome) = state.tick_flight(&flight_id) else {
            continue;
        };
        summary.evaluated += 1;
        match outcome {
            TickOutcome::ContextBuilt(id) => {
                summary.contexts_built += 1;
                tracing::debug!("Flight {}: context {} ready", flight_id, id);
            }
            TickOutcome::ContextReplaced { .. } => summary.contexts_replaced += 1,
            TickOutcome::Cleared { .. } => summary.cleared += 1,
            TickOutcome::BuildFailed(_) => summary.failures += 1,
            TickOutcome::ClassificationSkipped
            | TickOutcome::NoDecisionRequired
            | TickOutcome::ContextRetained(_)
            | TickOutcome::AlreadyDecided(_) => {}
        }
    }
    summary
}

pub async fn run_decision_loop(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(state.config().tick_interval());

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Decision loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let summary = run_tick(&state);
                if summary.failures > 0 {
                    tracing::warn!(
                        "Decision tick: {} of {} flights failed to build a context",
                        summary.failures,
                        summary.evaluated
                    );
                } else if summary.contexts_built + summary.contexts_replaced + summary.cleared > 0 {
                    tracing::info!(
                        "Decision tick: {} built, {} replaced, {} cleared",
                        summary.contexts_built,
                        summary.contexts_replaced,
                        summary.cleared
                    );
                }
            }
        }
    }
}
