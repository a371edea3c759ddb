//! In-memory state store using DashMap.
//!
//! One slot per tracked flight holds the latest telemetry, side signals and
//! the flight's orchestrator. The orchestrator sits behind its own mutex so a
//! decision submission and a loop tick for the same flight are serialized,
//! while different flights proceed independently.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use divert_core::{
    generate_response_plan, sampler_for, DecidedBy, DecisionContext, DecisionError,
    DecisionOrchestrator, DecisionOutcome, DecisionPhase, DecisionResources, EmergencyScenario,
    FlightState, OptionId, PerformanceMetrics, ResponsePlan, SideSignals, TickOutcome,
};

use crate::config::Config;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("flight {0} is not tracked")]
    UnknownFlight(String),

    #[error("invalid telemetry: {}", .0.join("; "))]
    InvalidTelemetry(Vec<String>),

    #[error("no emergency detected for flight {0}")]
    NoEmergency(String),

    #[error(transparent)]
    Decision(#[from] DecisionError),
}

/// Event pushed to stream subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DecisionEvent {
    ContextCreated {
        flight_id: String,
        context: DecisionContext,
    },
    ContextReplaced {
        flight_id: String,
        previous: Uuid,
        context: DecisionContext,
    },
    ContextCleared {
        flight_id: String,
        context_id: Option<Uuid>,
    },
    DecisionRecorded {
        flight_id: String,
        outcome: DecisionOutcome,
        plan: ResponsePlan,
    },
    FlightDropped {
        flight_id: String,
    },
}

impl DecisionEvent {
    pub fn flight_id(&self) -> &str {
        match self {
            DecisionEvent::ContextCreated { flight_id, .. }
            | DecisionEvent::ContextReplaced { flight_id, .. }
            | DecisionEvent::ContextCleared { flight_id, .. }
            | DecisionEvent::DecisionRecorded { flight_id, .. }
            | DecisionEvent::FlightDropped { flight_id } => flight_id,
        }
    }
}

/// Pre-serialized event, shared across subscribers.
#[derive(Debug, Clone)]
pub struct StreamMessage {
    pub flight_id: String,
    pub payload: Arc<str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightSummary {
    pub flight_id: String,
    pub aircraft_type: String,
    pub phase: DecisionPhase,
    pub active_context_id: Option<Uuid>,
    pub decisions: usize,
    pub last_seen: DateTime<Utc>,
}

struct FlightSlot {
    flight: FlightState,
    signals: SideSignals,
    last_seen: DateTime<Utc>,
    orchestrator: Mutex<DecisionOrchestrator>,
}

impl FlightSlot {
    fn orchestrator(&self) -> MutexGuard<'_, DecisionOrchestrator> {
        self.orchestrator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct StoredPlan {
    flight_id: String,
    plan: ResponsePlan,
}

/// Application state - thread-safe store for flights and decision plans.
pub struct AppState {
    config: Config,
    resources: DecisionResources,
    flights: DashMap<String, FlightSlot>,
    plans: DashMap<Uuid, StoredPlan>,
    pub tx: broadcast::Sender<StreamMessage>,
}

impl AppState {
    pub fn new(config: Config, resources: DecisionResources) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            resources,
            flights: DashMap::new(),
            plans: DashMap::new(),
            tx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resources(&self) -> &DecisionResources {
        &self.resources
    }

    /// Record the latest telemetry and signals for a flight, creating its
    /// orchestrator on first contact.
    pub fn ingest_telemetry(&self, flight: FlightState, signals: SideSignals) -> Result<(), StateError> {
        let mut errors = flight.validate();
        if self.resources.aircraft.get(&flight.aircraft_type).is_none() {
            errors.push(format!("Unknown aircraft type '{}'", flight.aircraft_type));
        }
        if !errors.is_empty() {
            return Err(StateError::InvalidTelemetry(errors));
        }

        let now = Utc::now();
        match self.flights.entry(flight.flight_id.clone()) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                slot.flight = flight;
                slot.signals = signals;
                slot.last_seen = now;
            }
            Entry::Vacant(entry) => {
                let flight_id = flight.flight_id.clone();
                let orchestrator = DecisionOrchestrator::new(
                    flight_id.clone(),
                    self.resources.clone(),
                    sampler_for(self.config.outcome_mode, self.config.outcome_seed),
                );
                entry.insert(FlightSlot {
                    flight,
                    signals,
                    last_seen: now,
                    orchestrator: Mutex::new(orchestrator),
                });
                tracing::info!("Tracking flight {}", flight_id);
            }
        }
        Ok(())
    }

    pub fn flight_ids(&self) -> Vec<String> {
        self.flights.iter().map(|r| r.key().clone()).collect()
    }

    pub fn flight_summaries(&self) -> Vec<FlightSummary> {
        let mut summaries: Vec<FlightSummary> = self
            .flights
            .iter()
            .map(|r| {
                let slot = r.value();
                let orchestrator = slot.orchestrator();
                FlightSummary {
                    flight_id: r.key().clone(),
                    aircraft_type: slot.flight.aircraft_type.clone(),
                    phase: orchestrator.phase(),
                    active_context_id: orchestrator.active_context().map(|c| c.id),
                    decisions: orchestrator.decision_history().len(),
                    last_seen: slot.last_seen,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.flight_id.cmp(&b.flight_id));
        summaries
    }

    /// Pure classification with the active policy.
    pub fn classify(&self, flight: &FlightState, signals: &SideSignals) -> Option<EmergencyScenario> {
        divert_core::classify_emergency(flight, signals, &self.resources.policy)
    }

    /// Run one orchestrator tick for a flight and broadcast what changed.
    pub fn tick_flight(&self, flight_id: &str) -> Option<TickOutcome> {
        let slot = self.flights.get(flight_id)?;
        let mut orchestrator = slot.orchestrator();
        let outcome = orchestrator.tick(&slot.flight, &slot.signals);

        let event = match &outcome {
            TickOutcome::ContextBuilt(_) => orchestrator.active_context().cloned().map(|context| {
                DecisionEvent::ContextCreated {
                    flight_id: flight_id.to_string(),
                    context,
                }
            }),
            TickOutcome::ContextReplaced { previous, .. } => {
                orchestrator.active_context().cloned().map(|context| {
                    DecisionEvent::ContextReplaced {
                        flight_id: flight_id.to_string(),
                        previous: *previous,
                        context,
                    }
                })
            }
            TickOutcome::Cleared { dropped } => Some(DecisionEvent::ContextCleared {
                flight_id: flight_id.to_string(),
                context_id: *dropped,
            }),
            _ => None,
        };
        if let Some(event) = event {
            self.publish(&event);
        }
        Some(outcome)
    }

    pub fn active_context(&self, flight_id: &str) -> Result<Option<DecisionContext>, StateError> {
        let slot = self
            .flights
            .get(flight_id)
            .ok_or_else(|| StateError::UnknownFlight(flight_id.to_string()))?;
        let orchestrator = slot.orchestrator();
        Ok(orchestrator.active_context().cloned())
    }

    /// Rebuild the context for the flight's current scenario, replacing any
    /// undecided one.
    pub fn regenerate_context(&self, flight_id: &str) -> Result<DecisionContext, StateError> {
        let slot = self
            .flights
            .get(flight_id)
            .ok_or_else(|| StateError::UnknownFlight(flight_id.to_string()))?;
        let mut orchestrator = slot.orchestrator();
        let scenario = orchestrator
            .classify(&slot.flight, &slot.signals)
            .ok_or_else(|| StateError::NoEmergency(flight_id.to_string()))?;

        let previous = orchestrator.active_context().map(|c| c.id);
        let context = orchestrator.generate_context(&slot.flight, &scenario)?;
        let event = match previous {
            Some(previous) => DecisionEvent::ContextReplaced {
                flight_id: flight_id.to_string(),
                previous,
                context: context.clone(),
            },
            None => DecisionEvent::ContextCreated {
                flight_id: flight_id.to_string(),
                context: context.clone(),
            },
        };
        self.publish(&event);
        Ok(context)
    }

    /// Record a decision and produce its response plan.
    pub fn submit_decision(
        &self,
        flight_id: &str,
        context_id: Uuid,
        option_id: &OptionId,
        decided_by: DecidedBy,
        response_time_s: f64,
    ) -> Result<(DecisionOutcome, ResponsePlan), StateError> {
        let slot = self
            .flights
            .get(flight_id)
            .ok_or_else(|| StateError::UnknownFlight(flight_id.to_string()))?;
        let outcome = slot
            .orchestrator()
            .submit_decision(context_id, option_id, decided_by, response_time_s)?;
        drop(slot);

        let plan = generate_response_plan(&outcome.scenario, &outcome.option);
        self.plans.insert(
            context_id,
            StoredPlan {
                flight_id: flight_id.to_string(),
                plan: plan.clone(),
            },
        );
        self.publish(&DecisionEvent::DecisionRecorded {
            flight_id: flight_id.to_string(),
            outcome: outcome.clone(),
            plan: plan.clone(),
        });
        Ok((outcome, plan))
    }

    pub fn history(&self, flight_id: &str) -> Result<(Vec<DecisionOutcome>, PerformanceMetrics), StateError> {
        let slot = self
            .flights
            .get(flight_id)
            .ok_or_else(|| StateError::UnknownFlight(flight_id.to_string()))?;
        let orchestrator = slot.orchestrator();
        let (outcomes, metrics) = orchestrator.history();
        Ok((outcomes.to_vec(), metrics))
    }

    pub fn plan(&self, flight_id: &str, context_id: Uuid) -> Option<ResponsePlan> {
        self.plans
            .get(&context_id)
            .filter(|stored| stored.flight_id == flight_id)
            .map(|stored| stored.plan.clone())
    }

    /// Stop tracking flights with no telemetry for `timeout_secs`.
    pub fn drop_stale_flights(&self, now: DateTime<Utc>, timeout_secs: u64) -> Vec<String> {
        let timeout = ChronoDuration::seconds(timeout_secs.min(u64::from(u32::MAX)) as i64);
        let stale: Vec<String> = self
            .flights
            .iter()
            .filter(|r| now - r.value().last_seen > timeout)
            .map(|r| r.key().clone())
            .collect();

        for flight_id in &stale {
            self.flights.remove(flight_id);
            self.plans.retain(|_, stored| &stored.flight_id != flight_id);
            tracing::info!("Dropped flight {} (no telemetry for {}s)", flight_id, timeout_secs);
            self.publish(&DecisionEvent::FlightDropped {
                flight_id: flight_id.clone(),
            });
        }
        stale
    }

    fn publish(&self, event: &DecisionEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => {
                // No subscribers is not an error.
                let _ = self.tx.send(StreamMessage {
                    flight_id: event.flight_id().to_string(),
                    payload: Arc::from(payload),
                });
            }
            Err(e) => tracing::warn!("Failed to serialize decision event: {}", e),
        }
    }
}
