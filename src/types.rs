use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use std::sync::{Arc, Mutex};

use crate::state::SimulatorState;

// ── Constants ──────────────────────────────────────────────────────────

pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const GEMINI_KEY_DOCS_URL: &str = "https://ai.google.dev/gemini-api/docs/api-key";
pub const GEMINI_BILLING_DOCS_URL: &str = "https://ai.google.dev/gemini-api/docs/billing";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:17900";
pub const DEFAULT_NARRATIVE_LANGUAGE: &str = "Turkish";
pub const DEFAULT_HOME_TEAM: &str = "Galatasaray";
pub const DEFAULT_AWAY_TEAM: &str = "Fenerbahçe";
pub const STANDOUT_RATING: f64 = 8.0;
pub const SIMULATION_FAILED_MESSAGE: &str =
    "Something went wrong while simulating the match. Please try again.";

// ── Shared state type aliases ──────────────────────────────────────────

pub type SharedSimulator = Arc<Mutex<SimulatorState>>;

// ── App config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub model: String,
    pub api_base_url: String,
    pub bind_addr: String,
    pub narrative_language: String,
    pub live_search: bool,
    /// Only ever populated from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: GEMINI_DEFAULT_MODEL.to_string(),
            api_base_url: GEMINI_API_BASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            narrative_language: DEFAULT_NARRATIVE_LANGUAGE.to_string(),
            live_search: true,
            api_key: None,
        }
    }
}

impl AppConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

// ── Request ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    pub home_team: String,
    pub away_team: String,
    pub date: String,
}

impl SimulationRequest {
    pub fn new(home_team: impl Into<String>, away_team: impl Into<String>, date: impl Into<String>) -> Self {
        SimulationRequest {
            home_team: home_team.into(),
            away_team: away_team.into(),
            date: date.into(),
        }
    }
}

// ── Result ─────────────────────────────────────────────────────────────

/// For fields the model may omit: `null` or a value of the wrong type reads
/// as the default instead of failing the whole payload.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Everything the model sends back for one simulated match, plus the
/// client-measured latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub home_team: String,
    pub away_team: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub match_date: Option<String>,
    pub home_score: u32,
    pub away_score: u32,
    pub summary: String,
    #[serde(default, deserialize_with = "lenient")]
    pub stoppage_time1: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub stoppage_time2: u32,
    pub home_lineup: Lineup,
    pub away_lineup: Lineup,
    pub timeline: Vec<MatchEvent>,
    pub stats: MatchStats,
    /// Measured by the client, never requested from the model.
    #[serde(default)]
    pub simulation_process_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lineup {
    pub formation: String,
    #[serde(rename = "startingXI")]
    pub starting_xi: Vec<Player>,
    #[serde(default, deserialize_with = "lenient")]
    pub substitutes: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    pub position: String,
    pub rating: f64,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status_notes: Option<String>,
}

impl Player {
    pub fn is_standout(&self) -> bool {
        self.rating >= STANDOUT_RATING
    }

    /// Any non-empty note raises the warning, whitespace included.
    pub fn status_note(&self) -> Option<&str> {
        self.status_notes.as_deref().filter(|note| !note.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    pub minute: u32,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub extra_minute: Option<u32>,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub team: TeamSide,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Goal,
    YellowCard,
    RedCard,
    Substitution,
    Var,
    ShotMissed,
    Argument,
    Injury,
    StoppageTime,
    /// Anything the model invents outside the known set.
    #[serde(other)]
    Other,
}

impl EventType {
    pub const KNOWN: [EventType; 9] = [
        EventType::Goal,
        EventType::YellowCard,
        EventType::RedCard,
        EventType::Substitution,
        EventType::Var,
        EventType::ShotMissed,
        EventType::Argument,
        EventType::Injury,
        EventType::StoppageTime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Goal => "goal",
            EventType::YellowCard => "yellow_card",
            EventType::RedCard => "red_card",
            EventType::Substitution => "substitution",
            EventType::Var => "var",
            EventType::ShotMissed => "shot_missed",
            EventType::Argument => "argument",
            EventType::Injury => "injury",
            EventType::StoppageTime => "stoppage_time",
            EventType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Home,
    Away,
    None,
}

impl TeamSide {
    pub fn as_str(self) -> &'static str {
        match self {
            TeamSide::Home => "home",
            TeamSide::Away => "away",
            TeamSide::None => "none",
        }
    }
}

/// Each channel is `[home, away]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub possession: [f64; 2],
    pub shots: [f64; 2],
    pub shots_on_target: [f64; 2],
    pub corners: [f64; 2],
    pub fouls: [f64; 2],
}

impl MatchStats {
    /// Channels in display order: `(key, label, suffix, values)`.
    pub fn channels(&self) -> [(&'static str, &'static str, &'static str, [f64; 2]); 5] {
        [
            ("possession", "Possession", "%", self.possession),
            ("shots", "Shots", "", self.shots),
            ("shotsOnTarget", "Shots on target", "", self.shots_on_target),
            ("corners", "Corners", "", self.corners),
            ("fouls", "Fouls", "", self.fouls),
        ]
    }
}
