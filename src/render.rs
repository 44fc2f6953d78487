//! Pure presentation of a [`SimulationResult`]. Nothing here touches the
//! network or mutates its input; the HTML layer only formats these views.

use crate::types::{EventType, Lineup, MatchEvent, Player, SimulationResult, TeamSide};
use serde::Serialize;

pub const MATCH_TAG: &str = "MATCH";
pub const FULL_TIME_LABEL: &str = "Full time";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub scoreboard: Scoreboard,
    pub summary: String,
    pub stats: Vec<StatBar>,
    pub home_lineup: LineupView,
    pub away_lineup: LineupView,
    pub timeline: Vec<TimelineEntry>,
    pub full_time_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scoreboard {
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub score: String,
    pub match_date: Option<String>,
    pub stoppage_time: [u32; 2],
    /// Goal events credited to each side. Not reconciled with the score.
    pub home_scorers: Vec<ScorerLine>,
    pub away_scorers: Vec<ScorerLine>,
    pub process_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorerLine {
    pub player: Option<String>,
    pub minute: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatBar {
    pub key: &'static str,
    pub label: &'static str,
    pub home_display: String,
    pub away_display: String,
    /// Percent of the bar, 0..=100.
    pub home_width: f64,
    pub away_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupView {
    pub team: String,
    pub formation: String,
    pub starting: Vec<PlayerRow>,
    pub substitutes: Vec<PlayerRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRow {
    pub position: String,
    pub name: String,
    pub rating: String,
    pub standout: bool,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventIcon {
    Goal,
    YellowCard,
    RedCard,
    Var,
    Substitution,
    Announcement,
}

impl EventIcon {
    pub fn for_event(kind: EventType) -> Self {
        match kind {
            EventType::Goal => EventIcon::Goal,
            EventType::YellowCard => EventIcon::YellowCard,
            EventType::RedCard => EventIcon::RedCard,
            EventType::Var => EventIcon::Var,
            EventType::Substitution => EventIcon::Substitution,
            _ => EventIcon::Announcement,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventIcon::Goal => "goal",
            EventIcon::YellowCard => "yellow_card",
            EventIcon::RedCard => "red_card",
            EventIcon::Var => "var",
            EventIcon::Substitution => "substitution",
            EventIcon::Announcement => "announcement",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            EventIcon::Goal => "⚽",
            EventIcon::YellowCard => "🟨",
            EventIcon::RedCard => "🟥",
            EventIcon::Var => "VAR",
            EventIcon::Substitution => "🔄",
            EventIcon::Announcement => "📢",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub minute: u32,
    pub minute_label: String,
    pub side: TeamSide,
    pub side_label: String,
    pub icon: EventIcon,
    pub player: Option<String>,
    pub description: String,
}

pub fn render(result: &SimulationResult) -> MatchView {
    MatchView {
        scoreboard: scoreboard(result),
        summary: result.summary.clone(),
        stats: result
            .stats
            .channels()
            .into_iter()
            .map(|(key, label, suffix, values)| stat_bar(key, label, suffix, values))
            .collect(),
        home_lineup: lineup_view(&result.home_team, &result.home_lineup),
        away_lineup: lineup_view(&result.away_team, &result.away_lineup),
        timeline: sorted_timeline(&result.timeline)
            .into_iter()
            .map(|event| timeline_entry(result, event))
            .collect(),
        full_time_label: FULL_TIME_LABEL,
    }
}

/// Ascending by minute; events sharing a minute keep their input order.
pub fn sorted_timeline(events: &[MatchEvent]) -> Vec<&MatchEvent> {
    let mut sorted: Vec<&MatchEvent> = events.iter().collect();
    sorted.sort_by_key(|event| event.minute);
    sorted
}

/// Goals for one side, in the order the timeline lists them.
pub fn goals_for(events: &[MatchEvent], side: TeamSide) -> Vec<&MatchEvent> {
    events
        .iter()
        .filter(|event| event.kind == EventType::Goal && event.team == side)
        .collect()
}

/// Width percentages for a two-sided bar. A zero (or degenerate) total
/// renders both sides empty.
pub fn bar_widths(values: [f64; 2]) -> (f64, f64) {
    let total = values[0] + values[1];
    if !total.is_finite() || total <= 0.0 {
        return (0.0, 0.0);
    }
    (values[0] / total * 100.0, values[1] / total * 100.0)
}

/// At most two decimals, trailing zeros dropped.
pub fn format_number(value: f64) -> String {
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn minute_label(event: &MatchEvent) -> String {
    match event.extra_minute {
        Some(extra) if extra > 0 => format!("{}+{}'", event.minute, extra),
        _ => format!("{}'", event.minute),
    }
}

fn scoreboard(result: &SimulationResult) -> Scoreboard {
    let scorers = |side: TeamSide| {
        goals_for(&result.timeline, side)
            .into_iter()
            .map(|event| ScorerLine {
                player: event.player.clone(),
                minute: event.minute,
                label: match event.player.as_deref() {
                    Some(name) => format!("{name} ({}')", event.minute),
                    None => format!("({}')", event.minute),
                },
            })
            .collect::<Vec<_>>()
    };
    Scoreboard {
        home_team: result.home_team.clone(),
        away_team: result.away_team.clone(),
        home_score: result.home_score,
        away_score: result.away_score,
        score: format!("{} - {}", result.home_score, result.away_score),
        match_date: result.match_date.clone(),
        stoppage_time: [result.stoppage_time1, result.stoppage_time2],
        home_scorers: scorers(TeamSide::Home),
        away_scorers: scorers(TeamSide::Away),
        process_time_ms: result.simulation_process_time_ms,
    }
}

fn stat_bar(key: &'static str, label: &'static str, suffix: &str, values: [f64; 2]) -> StatBar {
    let (home_width, away_width) = bar_widths(values);
    StatBar {
        key,
        label,
        home_display: format!("{}{suffix}", format_number(values[0])),
        away_display: format!("{}{suffix}", format_number(values[1])),
        home_width,
        away_width,
    }
}

fn player_row(player: &Player) -> PlayerRow {
    PlayerRow {
        position: player.position.clone(),
        name: player.name.clone(),
        rating: format_number(player.rating),
        standout: player.is_standout(),
        warning: player.status_note().map(str::to_string),
    }
}

fn lineup_view(team: &str, lineup: &Lineup) -> LineupView {
    LineupView {
        team: team.to_string(),
        formation: lineup.formation.clone(),
        starting: lineup.starting_xi.iter().map(player_row).collect(),
        substitutes: lineup.substitutes.iter().map(player_row).collect(),
    }
}

fn timeline_entry(result: &SimulationResult, event: &MatchEvent) -> TimelineEntry {
    let side_label = match event.team {
        TeamSide::Home => result.home_team.clone(),
        TeamSide::Away => result.away_team.clone(),
        TeamSide::None => MATCH_TAG.to_string(),
    };
    TimelineEntry {
        minute: event.minute,
        minute_label: minute_label(event),
        side: event.team,
        side_label,
        icon: EventIcon::for_event(event.kind),
        player: event.player.clone().filter(|name| !name.trim().is_empty()),
        description: event.description.clone(),
    }
}
