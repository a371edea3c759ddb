//! Flight simulation for driving the decision server.

pub mod paths;
pub mod scenarios;

pub use paths::{FlightPath, GreatCirclePath};
pub use scenarios::{build_scenario, ScenarioKind, ScriptedFlight};
