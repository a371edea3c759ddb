//! SDK client for the diversion decision server.

use anyhow::{Context, Result};
use divert_core::{
    Airport, DecidedBy, DecisionContext, DecisionOutcome, DecisionPolicy, EmergencyScenario,
    FlightState, OptionId, PerformanceMetrics, ResponsePlan, SideSignals,
};
use reqwest::{Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Client for connecting to the decision server.
pub struct DivertClient {
    pub(crate) base_url: String,
    pub(crate) client: reqwest::Client,
}

/// Body of `POST /v1/telemetry` and `POST /v1/classify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub flight: FlightState,
    #[serde(default)]
    pub signals: SideSignals,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextView {
    #[serde(flatten)]
    pub context: DecisionContext,
    pub seconds_remaining: i64,
}

#[derive(Debug, Serialize)]
struct DecisionRequest<'a> {
    context_id: Uuid,
    option_id: &'a OptionId,
    decided_by: DecidedBy,
    response_time_s: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionResponse {
    pub outcome: DecisionOutcome,
    pub plan: ResponsePlan,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub flight_id: String,
    pub outcomes: Vec<DecisionOutcome>,
    pub metrics: PerformanceMetrics,
}

impl DivertClient {
    /// Create a new client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a telemetry frame for one flight.
    pub async fn send_telemetry(&self, flight: &FlightState, signals: &SideSignals) -> Result<()> {
        let url = format!("{}/v1/telemetry", self.base_url);
        let frame = TelemetryFrame {
            flight: flight.clone(),
            signals: signals.clone(),
        };

        let response = self.client.post(&url).json(&frame).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to send telemetry: {} {}", status, body);
        }
        Ok(())
    }

    /// Classify a state without registering it.
    pub async fn classify(
        &self,
        flight: &FlightState,
        signals: &SideSignals,
    ) -> Result<Option<EmergencyScenario>> {
        let url = format!("{}/v1/classify", self.base_url);
        let frame = TelemetryFrame {
            flight: flight.clone(),
            signals: signals.clone(),
        };
        let response = self.client.post(&url).json(&frame).send().await?;
        read_json(response, "classify").await
    }

    /// Fetch the active decision context. `Ok(None)` when the flight has none.
    pub async fn get_context(&self, flight_id: &str) -> Result<Option<ContextView>> {
        let url = format!("{}/v1/flights/{}/context", self.base_url, flight_id);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response, "get context").await.map(Some)
    }

    /// Force a fresh context for the flight's current scenario.
    pub async fn regenerate_context(&self, flight_id: &str) -> Result<ContextView> {
        let url = format!("{}/v1/flights/{}/context", self.base_url, flight_id);
        let response = self.client.post(&url).send().await?;
        read_json(response, "regenerate context").await
    }

    /// Submit the decision for a context.
    pub async fn submit_decision(
        &self,
        flight_id: &str,
        context_id: Uuid,
        option_id: &OptionId,
        decided_by: DecidedBy,
        response_time_s: f64,
    ) -> Result<DecisionResponse> {
        let url = format!("{}/v1/flights/{}/decisions", self.base_url, flight_id);
        let request = DecisionRequest {
            context_id,
            option_id,
            decided_by,
            response_time_s,
        };
        let response = self.client.post(&url).json(&request).send().await?;
        read_json(response, "submit decision").await
    }

    pub async fn get_history(&self, flight_id: &str) -> Result<HistoryResponse> {
        let url = format!("{}/v1/flights/{}/history", self.base_url, flight_id);
        let response = self.client.get(&url).send().await?;
        read_json(response, "get history").await
    }

    pub async fn get_plan(&self, flight_id: &str, context_id: Uuid) -> Result<ResponsePlan> {
        let url = format!(
            "{}/v1/flights/{}/plans/{}",
            self.base_url, flight_id, context_id
        );
        let response = self.client.get(&url).send().await?;
        read_json(response, "get plan").await
    }

    pub async fn get_policy(&self) -> Result<DecisionPolicy> {
        let url = format!("{}/v1/policy", self.base_url);
        let response = self.client.get(&url).send().await?;
        read_json(response, "get policy").await
    }

    pub async fn list_airports(&self) -> Result<Vec<Airport>> {
        let url = format!("{}/v1/airports", self.base_url);
        let response = self.client.get(&url).send().await?;
        read_json(response, "list airports").await
    }

    /// Check the server is up.
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Health check failed: {}", response.status());
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("{} failed with {}: {}", action, status, body);
        anyhow::bail!("Failed to {}: {} {}", action, status, body);
    }
    response
        .json()
        .await
        .with_context(|| format!("decoding {action} response"))
}
