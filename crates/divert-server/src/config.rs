//! Server configuration from environment.

use std::env;
use std::fs;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use divert_core::{
    AircraftPerformanceTable, AirportDirectory, DecisionPolicy, DecisionResources, SamplingMode,
    DEFAULT_SEARCH_RADIUS_NM,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub tick_interval_ms: u64,
    pub search_radius_nm: f64,
    pub outcome_mode: SamplingMode,
    pub outcome_seed: Option<u64>,
    pub policy_path: Option<String>,
    pub airports_path: Option<String>,
    pub aircraft_path: Option<String>,
    /// Flights silent for this long are dropped from tracking
    pub flight_timeout_secs: u64,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            tick_interval_ms: 2000,
            search_radius_nm: DEFAULT_SEARCH_RADIUS_NM,
            outcome_mode: SamplingMode::Simulated,
            outcome_seed: None,
            policy_path: None,
            airports_path: None,
            aircraft_path: None,
            flight_timeout_secs: 300,
            log_json: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env::var("DIVERT_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.server_port),
            tick_interval_ms: env::var("DIVERT_TICK_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|ms: &u64| *ms > 0)
                .unwrap_or(defaults.tick_interval_ms),
            search_radius_nm: env::var("DIVERT_SEARCH_RADIUS_NM")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|nm: &f64| nm.is_finite() && *nm > 0.0)
                .unwrap_or(defaults.search_radius_nm),
            outcome_mode: env::var("DIVERT_OUTCOME_MODE")
                .ok()
                .and_then(|s| parse_outcome_mode(&s))
                .unwrap_or(defaults.outcome_mode),
            outcome_seed: env::var("DIVERT_OUTCOME_SEED")
                .ok()
                .and_then(|s| s.parse().ok()),
            policy_path: non_empty_var("DIVERT_POLICY_PATH"),
            airports_path: non_empty_var("DIVERT_AIRPORTS_PATH"),
            aircraft_path: non_empty_var("DIVERT_AIRCRAFT_PATH"),
            flight_timeout_secs: env::var("DIVERT_FLIGHT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.flight_timeout_secs),
            log_json: env::var("DIVERT_LOG_FORMAT")
                .map(|s| s.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Load policy and reference tables, falling back to the built-ins for
    /// any path that is not configured.
    pub fn load_resources(&self) -> Result<DecisionResources> {
        let policy = match &self.policy_path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading decision policy from {path}"))?;
                DecisionPolicy::from_json(&raw)
                    .with_context(|| format!("parsing decision policy {path}"))?
            }
            None => DecisionPolicy::default(),
        };
        let problems = policy.validate();
        if !problems.is_empty() {
            bail!("invalid decision policy: {}", problems.join("; "));
        }

        let airports = match &self.airports_path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading airport directory from {path}"))?;
                AirportDirectory::from_json(&raw)
                    .with_context(|| format!("parsing airport directory {path}"))?
            }
            None => AirportDirectory::builtin(),
        };

        let aircraft = match &self.aircraft_path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading aircraft table from {path}"))?;
                AircraftPerformanceTable::from_json(&raw)
                    .with_context(|| format!("parsing aircraft table {path}"))?
            }
            None => AircraftPerformanceTable::builtin(),
        };

        tracing::info!(
            "Loaded {} airports and {} aircraft profiles",
            airports.len(),
            aircraft.len()
        );

        Ok(DecisionResources::new(policy, airports, aircraft)
            .with_search_radius(self.search_radius_nm))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn parse_outcome_mode(raw: &str) -> Option<SamplingMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "estimate" => Some(SamplingMode::Estimate),
        "simulated" => Some(SamplingMode::Simulated),
        other => {
            tracing::warn!("Unknown DIVERT_OUTCOME_MODE '{}', using default", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_mode_parsing() {
        assert_eq!(parse_outcome_mode("Estimate"), Some(SamplingMode::Estimate));
        assert_eq!(parse_outcome_mode(" simulated "), Some(SamplingMode::Simulated));
        assert_eq!(parse_outcome_mode("random"), None);
    }

    #[test]
    fn builtin_resources_load_without_paths() {
        let config = Config {
            search_radius_nm: 250.0,
            ..Config::default()
        };
        let resources = config.load_resources().unwrap();
        assert!(!resources.airports.is_empty());
        assert!(resources.aircraft.get("B777").is_some());
        assert_eq!(resources.search_radius_nm, 250.0);
    }

    #[test]
    fn missing_policy_file_is_an_error() {
        let config = Config {
            policy_path: Some("/nonexistent/divert-policy.json".into()),
            ..Config::default()
        };
        assert!(config.load_resources().is_err());
    }
}
