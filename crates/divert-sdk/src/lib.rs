//! Diversion SDK - client library for the decision service
//!
//! Streams flight telemetry to the server, fetches decision contexts and
//! submits decisions.

pub mod client;

pub use client::{ContextView, DecisionResponse, DivertClient, HistoryResponse, TelemetryFrame};
pub use divert_core::models::{FlightState, SideSignals};
