use crate::config::append_gemini_log;
use crate::error::ExternalCallError;
use crate::prompt::SimulationPrompt;
use crate::types::AppConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// The generative capability: given a prompt and schema, return the raw text
/// the model produced. Implementations own transport and vendor details.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &SimulationPrompt) -> Result<String, ExternalCallError>;
}

// ── Wire types ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: Option<GeminiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: Option<String>,
    status: Option<String>,
}

// ── Client ─────────────────────────────────────────────────────────────

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    live_search: bool,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Self {
        GeminiClient {
            http: reqwest::Client::new(),
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
            model: config.model.trim().to_string(),
            base_url: config.api_base_url.trim().trim_end_matches('/').to_string(),
            live_search: config.live_search,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    pub fn request_body(&self, prompt: &SimulationPrompt) -> Value {
        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt.instruction }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": prompt.schema
            }
        });
        if self.live_search {
            body["tools"] = json!([{ "google_search": {} }]);
        }
        body
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &SimulationPrompt) -> Result<String, ExternalCallError> {
        let api_key = self.api_key.as_deref().ok_or(ExternalCallError::MissingCredential)?;
        let url = self.endpoint();
        let body = self.request_body(prompt);
        append_gemini_log(
            "Gemini request",
            &format!(
                "url: {url}\nx-goog-api-key: [redacted]\nlive search: {}\nprompt:\n{}",
                self.live_search, prompt.instruction
            ),
        );

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                append_gemini_log("Gemini error", &format!("send failed: {e}"));
                ExternalCallError::Transport(e.to_string())
            })?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            append_gemini_log("Gemini error", &format!("read failed: {e}"));
            ExternalCallError::Transport(format!("read failed: {e}"))
        })?;
        append_gemini_log("Gemini response", &format!("status: {status}\nbody:\n{text}"));
        debug!(status = status.as_u16(), bytes = text.len(), "Gemini response received");

        if !status.is_success() {
            return Err(ExternalCallError::Provider {
                status: status.as_u16(),
                message: provider_error_message(&text),
            });
        }
        extract_response_text(status.as_u16(), &text)
    }
}

/// Concatenates the answer parts of the first candidate. Thought parts are
/// skipped. A missing candidate yields an empty string.
pub fn extract_response_text(status: u16, body: &str) -> Result<String, ExternalCallError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ExternalCallError::Provider {
            status,
            message: format!("unreadable response envelope: {e}"),
        })?;
    let text = parsed
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|part| !part.thought.unwrap_or(false))
        .filter_map(|part| part.text)
        .collect::<String>();
    Ok(text)
}

pub fn provider_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error);
    match parsed {
        Some(GeminiErrorBody { message: Some(message), status: Some(status) }) => format!("{status}: {message}"),
        Some(GeminiErrorBody { message: Some(message), .. }) => message,
        _ => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty error body".to_string()
            } else {
                trimmed.chars().take(300).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GEMINI_API_BASE_URL;

    fn prompt() -> SimulationPrompt {
        SimulationPrompt {
            instruction: "simulate".to_string(),
            schema: json!({ "type": "OBJECT" }),
        }
    }

    fn config(live_search: bool, api_key: Option<&str>) -> AppConfig {
        AppConfig {
            api_base_url: format!("{GEMINI_API_BASE_URL}/"),
            live_search,
            api_key: api_key.map(str::to_string),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_endpoint_uses_configured_model() {
        let client = GeminiClient::new(&config(true, Some("key")));
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn test_request_body_requests_json_and_search() {
        let body = GeminiClient::new(&config(true, Some("key"))).request_body(&prompt());
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "simulate");
        assert!(body["tools"][0].get("google_search").is_some());

        let without_search = GeminiClient::new(&config(false, Some("key"))).request_body(&prompt());
        assert!(without_search.get("tools").is_none());
    }

    #[test]
    fn test_extract_response_text_skips_thoughts() {
        let body = r#"{"candidates": [{"content": {"parts": [
            {"text": "thinking...", "thought": true},
            {"text": "{\"homeTeam\":"},
            {"text": " \"A\"}"}
        ]}}]}"#;
        assert_eq!(extract_response_text(200, body).unwrap(), "{\"homeTeam\": \"A\"}");
    }

    #[test]
    fn test_extract_response_text_without_candidates_is_empty() {
        assert_eq!(extract_response_text(200, r#"{"promptFeedback": {}}"#).unwrap(), "");
        assert!(matches!(
            extract_response_text(200, "<html>"),
            Err(ExternalCallError::Provider { status: 200, .. })
        ));
    }

    #[test]
    fn test_provider_error_message() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(provider_error_message(body), "PERMISSION_DENIED: API key not valid");
        assert_eq!(provider_error_message("  "), "empty error body");
        assert_eq!(provider_error_message("bad gateway"), "bad gateway");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_sending() {
        let client = GeminiClient::new(&config(true, Some("   ")));
        let err = client.generate(&prompt()).await.unwrap_err();
        assert_eq!(err, ExternalCallError::MissingCredential);
    }
}
