use crate::error::{MalformedResponseError, SimulationError};
use crate::gemini::GenerativeModel;
use crate::prompt::build_prompt;
use crate::types::{AppConfig, SimulationRequest, SimulationResult};
use chrono::{Local, NaiveDate};
use serde_json::Value;
use std::{sync::Arc, time::Instant};
use tracing::{info, warn};

/// Issues one model call per simulation. Holds no cache: identical requests
/// produce independent calls.
#[derive(Clone)]
pub struct SimulationClient {
    model: Arc<dyn GenerativeModel>,
    language: String,
}

impl SimulationClient {
    pub fn new(model: Arc<dyn GenerativeModel>, config: &AppConfig) -> Self {
        SimulationClient {
            model,
            language: config.narrative_language.clone(),
        }
    }

    pub async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationResult, SimulationError> {
        self.simulate_on(request, Local::now().date_naive()).await
    }

    pub async fn simulate_on(
        &self,
        request: &SimulationRequest,
        today: NaiveDate,
    ) -> Result<SimulationResult, SimulationError> {
        let prompt = build_prompt(request, &self.language, today)?;
        info!(home = %request.home_team, away = %request.away_team, date = %request.date, "Simulation requested");

        let started = Instant::now();
        let outcome = self.model.generate(&prompt).await;
        let elapsed_ms = (started.elapsed().as_secs_f64() * 1000.0).round() as u64;

        let text = outcome.map_err(|e| {
            warn!(elapsed_ms, "External call failed: {e}");
            SimulationError::from(e)
        })?;
        let mut result = parse_simulation_payload(&text).map_err(|e| {
            warn!(elapsed_ms, bytes = text.len(), "Malformed model response: {e}");
            SimulationError::from(e)
        })?;
        result.simulation_process_time_ms = elapsed_ms;
        info!(
            elapsed_ms,
            score = %format!("{}-{}", result.home_score, result.away_score),
            events = result.timeline.len(),
            "Simulation complete"
        );
        Ok(result)
    }
}

/// Parses model text into a result. Any timing value in the payload is
/// discarded; the caller attaches its own measurement.
pub fn parse_simulation_payload(text: &str) -> Result<SimulationResult, MalformedResponseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MalformedResponseError::Empty);
    }
    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| MalformedResponseError::InvalidJson(e.to_string()))?;
    if !value.is_object() {
        return Err(MalformedResponseError::ContractViolation(
            "top-level value is not an object".to_string(),
        ));
    }
    let mut result: SimulationResult = serde_json::from_value(value)
        .map_err(|e| MalformedResponseError::ContractViolation(e.to_string()))?;
    check_stats(&result)?;
    result.simulation_process_time_ms = 0;
    Ok(result)
}

fn check_stats(result: &SimulationResult) -> Result<(), MalformedResponseError> {
    for (key, _, _, values) in result.stats.channels() {
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(MalformedResponseError::ContractViolation(format!(
                "stats.{key} has a negative or non-finite value: {values:?}"
            )));
        }
    }
    Ok(())
}
