use crate::error::SimulationError;
use crate::types::{EventType, SimulationRequest};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

/// What goes over the wire: the instruction text and the response schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationPrompt {
    pub instruction: String,
    pub schema: Value,
}

pub fn parse_match_date(raw: &str) -> Result<NaiveDate, SimulationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| SimulationError::InvalidRequest(format!("date {raw:?} is not a YYYY-MM-DD calendar date: {e}")))
}

/// Team names are taken verbatim; only emptiness is rejected.
pub fn validate_request(request: &SimulationRequest) -> Result<NaiveDate, SimulationError> {
    if request.home_team.trim().is_empty() {
        return Err(SimulationError::InvalidRequest("home team is empty".to_string()));
    }
    if request.away_team.trim().is_empty() {
        return Err(SimulationError::InvalidRequest("away team is empty".to_string()));
    }
    parse_match_date(&request.date)
}

pub fn build_prompt(
    request: &SimulationRequest,
    language: &str,
    today: NaiveDate,
) -> Result<SimulationPrompt, SimulationError> {
    let match_date = validate_request(request)?;
    Ok(SimulationPrompt {
        instruction: build_instruction(
            request.home_team.trim(),
            request.away_team.trim(),
            match_date,
            language,
            today,
        ),
        schema: match_schema(language),
    })
}

pub fn build_instruction(home: &str, away: &str, match_date: NaiveDate, language: &str, today: NaiveDate) -> String {
    let match_date = match_date.format("%Y-%m-%d");
    let today = today.format("%Y-%m-%d");
    format!(
        r#"You are an expert football data analyst and match simulation engineer.
Task: simulate the match between {home} (home) and {away} (away) as of {match_date}, using CURRENT data.

CRITICAL INSTRUCTIONS:
1. LIVE SEARCH: Use web search to find the most recent squads of BOTH teams as of today ({today}): injuries, suspensions and players sent out on loan. A player who has been transferred to another club or loaned out must NOT appear in either lineup.
2. NEWS ANALYSIS: Scan player morale, social media activity, disciplinary issues and pre-match statements, and reflect them in the summary and in each player's statusNotes.
3. LANGUAGE: Write every narrative field (summary, description, statusNotes) in fluent, natural {language}, using proper football terminology (offside, VAR review, corner kick and so on).
4. SIMULATION DETAIL: Simulate the key moments minute by minute, including near misses, shots off the post, arguments and VAR decisions, not only goals. Compute stoppage time for each half realistically and report it in stoppageTime1 and stoppageTime2.

Return the output strictly in the supplied JSON schema and nothing else."#
    )
}

fn player_schema(language: &str) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "position": { "type": "STRING" },
            "rating": { "type": "NUMBER" },
            "statusNotes": {
                "type": "STRING",
                "description": format!("Player's current condition, injury or morale note ({language})")
            }
        },
        "required": ["name", "position", "rating"]
    })
}

fn lineup_schema(language: &str) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "formation": { "type": "STRING" },
            "startingXI": { "type": "ARRAY", "items": player_schema(language) },
            "substitutes": { "type": "ARRAY", "items": player_schema(language) }
        },
        "required": ["formation", "startingXI"]
    })
}

fn stat_pair_schema() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "NUMBER" }, "minItems": 2, "maxItems": 2 })
}

/// Structured-output schema for one simulated match. `simulationProcessTimeMs`
/// is left out; the client measures it.
pub fn match_schema(language: &str) -> Value {
    let event_types: Vec<&str> = EventType::KNOWN.iter().map(|kind| kind.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "homeTeam": { "type": "STRING" },
            "awayTeam": { "type": "STRING" },
            "matchDate": { "type": "STRING" },
            "homeScore": { "type": "INTEGER" },
            "awayScore": { "type": "INTEGER" },
            "summary": {
                "type": "STRING",
                "description": format!("Overall match summary ({language})")
            },
            "stoppageTime1": { "type": "INTEGER" },
            "stoppageTime2": { "type": "INTEGER" },
            "homeLineup": lineup_schema(language),
            "awayLineup": lineup_schema(language),
            "timeline": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "minute": { "type": "INTEGER" },
                        "extraMinute": { "type": "INTEGER" },
                        "type": { "type": "STRING", "format": "enum", "enum": event_types },
                        "team": { "type": "STRING", "format": "enum", "enum": ["home", "away", "none"] },
                        "player": { "type": "STRING" },
                        "description": {
                            "type": "STRING",
                            "description": format!("Detailed narration of the incident ({language})")
                        }
                    },
                    "required": ["minute", "type", "team", "description"]
                }
            },
            "stats": {
                "type": "OBJECT",
                "properties": {
                    "possession": stat_pair_schema(),
                    "shots": stat_pair_schema(),
                    "shotsOnTarget": stat_pair_schema(),
                    "corners": stat_pair_schema(),
                    "fouls": stat_pair_schema()
                },
                "required": ["possession", "shots", "shotsOnTarget", "corners", "fouls"]
            }
        },
        "required": [
            "homeTeam", "awayTeam", "homeScore", "awayScore", "summary",
            "homeLineup", "awayLineup", "timeline", "stats"
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn required(value: &Value) -> Vec<&str> {
        value["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect()
    }

    #[test]
    fn test_rejects_blank_teams_and_bad_dates() {
        let blank_home = SimulationRequest::new("  ", "Fenerbahçe", "2024-05-19");
        assert!(matches!(
            build_prompt(&blank_home, "Turkish", today()),
            Err(SimulationError::InvalidRequest(_))
        ));
        let blank_away = SimulationRequest::new("Galatasaray", "", "2024-05-19");
        assert!(build_prompt(&blank_away, "Turkish", today()).is_err());
        for date in ["2024-02-30", "19/05/2024", ""] {
            let request = SimulationRequest::new("Galatasaray", "Fenerbahçe", date);
            assert!(build_prompt(&request, "Turkish", today()).is_err(), "{date} accepted");
        }
    }

    #[test]
    fn test_instruction_covers_required_directives() {
        let request = SimulationRequest::new("Galatasaray", "Fenerbahçe", "2024-05-19");
        let prompt = build_prompt(&request, "Turkish", today()).unwrap();
        let text = &prompt.instruction;
        assert!(text.contains("Galatasaray"));
        assert!(text.contains("Fenerbahçe"));
        assert!(text.contains("2024-05-19"));
        assert!(text.contains("2024-05-01"));
        assert!(text.contains("web search"));
        assert!(text.contains("loaned out"));
        assert!(text.contains("social media"));
        assert!(text.contains("natural Turkish"));
        assert!(text.contains("VAR decisions"));
        assert!(text.contains("stoppage time"));
        assert!(text.contains("JSON schema"));
    }

    #[test]
    fn test_team_names_are_kept_verbatim() {
        let request = SimulationRequest::new("man utd", "SPURS", "2024-05-19");
        let prompt = build_prompt(&request, "English", today()).unwrap();
        assert!(prompt.instruction.contains("man utd (home)"));
        assert!(prompt.instruction.contains("SPURS (away)"));
    }

    #[test]
    fn test_schema_required_fields() {
        let schema = match_schema("Turkish");
        let top = required(&schema);
        for field in [
            "homeTeam", "awayTeam", "homeScore", "awayScore", "summary",
            "homeLineup", "awayLineup", "timeline", "stats",
        ] {
            assert!(top.contains(&field), "missing {field}");
        }
        assert!(!top.contains(&"stoppageTime1"));
        assert!(schema["properties"].get("simulationProcessTimeMs").is_none());

        let player = &schema["properties"]["homeLineup"]["properties"]["startingXI"]["items"];
        assert_eq!(required(player), vec!["name", "position", "rating"]);

        let event = &schema["properties"]["timeline"]["items"];
        assert_eq!(required(event), vec!["minute", "type", "team", "description"]);
        assert_eq!(event["properties"]["type"]["enum"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn test_build_is_pure() {
        let request = SimulationRequest::new("Galatasaray", "Fenerbahçe", "2024-05-19");
        let first = build_prompt(&request, "Turkish", today()).unwrap();
        let second = build_prompt(&request, "Turkish", today()).unwrap();
        assert_eq!(first, second);
    }
}
