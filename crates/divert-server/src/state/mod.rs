//! Shared application state.

pub mod store;

pub use store::{AppState, DecisionEvent, FlightSummary, StateError, StreamMessage};
