//! Server-rendered HTML for the simulator. Every string that may come from
//! the model or the form goes through [`escape_html`].

use crate::render::{LineupView, MatchView, PlayerRow, StatBar, TimelineEntry};
use crate::types::*;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Simulator,
    About,
    Api,
}

/// Values the form is pre-filled with.
#[derive(Debug, Clone)]
pub struct FormValues {
    pub home_team: String,
    pub away_team: String,
    pub date: String,
}

impl FormValues {
    pub fn defaults(today: &str) -> Self {
        FormValues {
            home_team: DEFAULT_HOME_TEAM.to_string(),
            away_team: DEFAULT_AWAY_TEAM.to_string(),
            date: today.to_string(),
        }
    }

    pub fn from_request(request: &SimulationRequest) -> Self {
        FormValues {
            home_team: request.home_team.clone(),
            away_team: request.away_team.clone(),
            date: request.date.clone(),
        }
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// ── Layout ─────────────────────────────────────────────────────────────

fn nav_link(href: &str, label: &str, active: bool) -> String {
    let class = if active { "nav-link active" } else { "nav-link" };
    format!(r#"<a class="{class}" href="{href}">{label}</a>"#)
}

pub fn layout(title: &str, tab: Tab, head_extra: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/static/style.css">
{head_extra}
</head>
<body>
<nav class="topbar">
  <form method="post" action="/reset" class="brand-form">
    <button type="submit" class="brand"><span class="brand-badge">AI</span> Football Simulator <span class="accent">PRO</span></button>
  </form>
  <div class="nav-links">{about}{api}{sim}</div>
</nav>
<main>
{body}
</main>
<footer>All data is generated by a language model for prediction purposes only.</footer>
</body>
</html>
"#,
        title = escape_html(title),
        about = nav_link("/about", "About", tab == Tab::About),
        api = nav_link("/api-info", "API", tab == Tab::Api),
        sim = nav_link("/", "Simulator", tab == Tab::Simulator),
    )
}

// ── Simulator pages ────────────────────────────────────────────────────

pub fn error_banner(message: &str) -> String {
    format!(
        r#"<div class="error-banner" role="alert">
  <p>{}</p>
  <form method="post" action="/dismiss"><button type="submit" class="link-button">Close</button></form>
</div>"#,
        escape_html(message)
    )
}

pub fn match_form(values: &FormValues, pending: bool) -> String {
    let disabled = if pending { " disabled" } else { "" };
    let button_label = if pending { "Analyzing the news..." } else { "Start simulation" };
    format!(
        r#"<section class="card form-card">
  <h2>New simulation</h2>
  <form method="post" action="/simulate" class="match-form">
    <label>Home team<input type="text" name="home" value="{home}" placeholder="e.g. Real Madrid" required{disabled}></label>
    <span class="versus">VS</span>
    <label>Away team<input type="text" name="away" value="{away}" placeholder="e.g. Manchester City" required{disabled}></label>
    <label class="wide">Match date<input type="date" name="date" value="{date}" required{disabled}></label>
    <button type="submit" class="primary wide"{disabled}>{button_label}</button>
  </form>
</section>"#,
        home = escape_html(&values.home_team),
        away = escape_html(&values.away_team),
        date = escape_html(&values.date),
    )
}

pub fn idle_page(values: &FormValues, error: Option<&str>) -> String {
    let mut body = String::from(
        r#"<header class="hero">
  <h1>Let <span class="accent">AI</span> write tomorrow's score</h1>
  <p>Search-grounded agents read injury reports, disciplinary news and even social media mood, then simulate the match minute by minute.</p>
</header>"#,
    );
    body.push_str(&match_form(values, false));
    if let Some(message) = error {
        body.push_str(&error_banner(message));
    }
    layout("Football Simulator", Tab::Simulator, "", &body)
}

pub fn loading_page(request: &SimulationRequest) -> String {
    let body = format!(
        r#"<section class="loading">
  <div class="spinner">⚽</div>
  <h3>Gathering data</h3>
  <p>Scanning injury reports, social media posts and tactical news for {home} vs {away}...</p>
</section>
{form}"#,
        home = escape_html(&request.home_team),
        away = escape_html(&request.away_team),
        form = match_form(&FormValues::from_request(request), true),
    );
    layout(
        "Simulating...",
        Tab::Simulator,
        r#"<meta http-equiv="refresh" content="2">"#,
        &body,
    )
}

pub fn result_page(view: &MatchView) -> String {
    let mut body = String::new();
    body.push_str(
        r#"<form method="post" action="/reset" class="toolbar"><button type="submit" class="link-button">&larr; New simulation</button></form>"#,
    );
    body.push_str(&scoreboard_html(view));
    body.push_str(r#"<div class="result-grid"><div class="main-column">"#);
    let _ = write!(
        body,
        r#"<section class="card"><h4>Match analysis</h4><p class="summary">{}</p></section>"#,
        escape_html(&view.summary)
    );
    body.push_str(&stats_html(&view.stats));
    body.push_str(r#"<div class="lineups">"#);
    body.push_str(&lineup_html(&view.home_lineup));
    body.push_str(&lineup_html(&view.away_lineup));
    body.push_str("</div></div>");
    body.push_str(&timeline_html(&view.timeline, view.full_time_label));
    body.push_str("</div>");
    let title = format!("{} vs {}", view.scoreboard.home_team, view.scoreboard.away_team);
    layout(&title, Tab::Simulator, "", &body)
}

fn scorer_list(labels: &[String]) -> String {
    labels
        .iter()
        .map(|label| format!(r#"<span class="scorer">{}</span>"#, escape_html(label)))
        .collect()
}

fn scoreboard_html(view: &MatchView) -> String {
    let board = &view.scoreboard;
    let home_scorers: Vec<String> = board.home_scorers.iter().map(|s| s.label.clone()).collect();
    let away_scorers: Vec<String> = board.away_scorers.iter().map(|s| s.label.clone()).collect();
    let date = board
        .match_date
        .as_deref()
        .map(|date| format!(r#"<div class="match-date">{}</div>"#, escape_html(date)))
        .unwrap_or_default();
    format!(
        r#"<section class="scoreboard">
  <div class="process-time">AI processing time: {ms}ms</div>
  {date}
  <div class="team home"><h3>{home}</h3><div class="scorers">{home_scorers}</div></div>
  <div class="score"><span>{home_score}</span><span class="dash">-</span><span>{away_score}</span></div>
  <div class="team away"><h3>{away}</h3><div class="scorers">{away_scorers}</div></div>
  <div class="added-time">Added time: +{st1}' / +{st2}'</div>
</section>"#,
        ms = board.process_time_ms,
        home = escape_html(&board.home_team),
        away = escape_html(&board.away_team),
        home_score = board.home_score,
        away_score = board.away_score,
        home_scorers = scorer_list(&home_scorers),
        away_scorers = scorer_list(&away_scorers),
        st1 = board.stoppage_time[0],
        st2 = board.stoppage_time[1],
    )
}

fn stats_html(stats: &[StatBar]) -> String {
    let mut out = String::from(r#"<section class="card"><h4>Match statistics</h4>"#);
    for bar in stats {
        let _ = write!(
            out,
            r#"<div class="stat">
  <div class="stat-row"><span>{home}</span><span class="stat-label">{label}</span><span>{away}</span></div>
  <div class="bar"><div class="bar-home" style="width: {hw:.2}%"></div><div class="bar-away" style="width: {aw:.2}%"></div></div>
</div>"#,
            home = escape_html(&bar.home_display),
            away = escape_html(&bar.away_display),
            label = bar.label,
            hw = bar.home_width,
            aw = bar.away_width,
        );
    }
    out.push_str("</section>");
    out
}

fn player_html(player: &PlayerRow) -> String {
    let warning = player
        .warning
        .as_deref()
        .map(|note| {
            let note = escape_html(note);
            format!(r#"<span class="status-note" title="{note}">⚠️<span class="note-text">{note}</span></span>"#)
        })
        .unwrap_or_default();
    let rating_class = if player.standout { "rating standout" } else { "rating" };
    format!(
        r#"<li class="player"><span class="position">{position}</span><span class="name">{name}</span>{warning}<span class="{rating_class}">{rating}</span></li>"#,
        position = escape_html(&player.position),
        name = escape_html(&player.name),
        rating = escape_html(&player.rating),
    )
}

fn lineup_html(lineup: &LineupView) -> String {
    let mut out = format!(
        r#"<section class="card lineup"><div class="lineup-head"><h5>{team}</h5><span class="formation">{formation}</span></div><ul>"#,
        team = escape_html(&lineup.team),
        formation = escape_html(&lineup.formation),
    );
    for player in &lineup.starting {
        out.push_str(&player_html(player));
    }
    out.push_str("</ul>");
    if !lineup.substitutes.is_empty() {
        out.push_str(r#"<h6>Bench</h6><ul class="bench">"#);
        for player in &lineup.substitutes {
            out.push_str(&player_html(player));
        }
        out.push_str("</ul>");
    }
    out.push_str("</section>");
    out
}

fn timeline_html(entries: &[TimelineEntry], full_time_label: &str) -> String {
    let mut out = String::from(r#"<aside class="card timeline"><h4>Live commentary</h4><ol>"#);
    for entry in entries {
        let actor = entry
            .player
            .as_deref()
            .map(|name| format!("<strong>{}:</strong> ", escape_html(name)))
            .unwrap_or_default();
        let _ = write!(
            out,
            r#"<li class="event"><span class="icon icon-{icon_class}">{glyph}</span><span class="minute">{minute}</span><span class="side side-{side}">{side_label}</span><p>{actor}{description}</p></li>"#,
            icon_class = entry.icon.as_str(),
            glyph = entry.icon.glyph(),
            minute = escape_html(&entry.minute_label),
            side = entry.side.as_str(),
            side_label = escape_html(&entry.side_label),
            description = escape_html(&entry.description),
        );
    }
    let _ = write!(
        out,
        r#"<li class="event full-time"><span class="icon">🏁</span><span class="minute">{}</span></li></ol></aside>"#,
        escape_html(full_time_label)
    );
    out
}

// ── Static pages ───────────────────────────────────────────────────────

pub fn about_page() -> String {
    let body = r#"<section class="card prose">
  <h2>About the project</h2>
  <p>Football Simulator goes beyond classic statistical models by analysing <strong>what is happening right now</strong> around both clubs.</p>
  <div class="feature-grid">
    <div><h4>News analysis</h4><p>Match-day injury news, training reports and manager statements are gathered through live web search.</p></div>
    <div><h4>Psychological factors</h4><p>Social media activity, player morale and disciplinary bans shape both lineup selection and performance.</p></div>
  </div>
  <p>Each match is then simulated minute by minute by a reasoning model, producing a realistic scenario with lineups, statistics and commentary.</p>
</section>"#;
    layout("About", Tab::About, "", body)
}

pub fn api_page(config: &AppConfig) -> String {
    let key_status = if config.has_api_key() { "configured" } else { "missing" };
    let search_status = if config.live_search { "enabled" } else { "disabled" };
    let body = format!(
        r#"<section class="card prose">
  <h2>Technology &amp; API</h2>
  <h4>Gemini API</h4>
  <p>The simulator sends one structured-output request per match to <code>{model}</code>, with live web search {search_status}.</p>
  <dl class="api-facts">
    <dt>Model</dt><dd>{model}</dd>
    <dt>Narrative language</dt><dd>{language}</dd>
    <dt>API key</dt><dd class="key-{key_status}">{key_status}</dd>
  </dl>
  <div class="developer-access">
    <h4>Developer access</h4>
    <p>Set <code>GEMINI_API_KEY</code> in the environment or in <code>.env</code> before starting the server. Keys are never entered through this page.</p>
    <a class="primary" href="{key_docs}" target="_blank" rel="noopener noreferrer">Get an API key</a>
    <a class="secondary" href="{billing_docs}" target="_blank" rel="noopener noreferrer">Billing information</a>
  </div>
</section>"#,
        model = escape_html(&config.model),
        language = escape_html(&config.narrative_language),
        key_docs = GEMINI_KEY_DOCS_URL,
        billing_docs = GEMINI_BILLING_DOCS_URL,
    );
    layout("API", Tab::Api, "", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;
    use crate::simulation::tests::derby_payload;

    fn derby() -> SimulationResult {
        serde_json::from_value(derby_payload()).unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }

    #[test]
    fn test_result_page_orders_timeline_and_ends_with_full_time() {
        let html = result_page(&render(&derby()));
        let timeline = &html[html.find("Live commentary").unwrap()..];
        let minute = |label: &str| {
            timeline
                .find(&format!(r#"<span class="minute">{label}</span>"#))
                .unwrap()
        };
        let first = minute("10&#39;");
        let second = minute("45&#39;");
        let third = minute("90+3&#39;");
        let full_time = minute("Full time");
        assert!(first < second && second < third && third < full_time);
        assert!(html.contains("Icardi (10&#39;)"));
        assert!(html.contains("AI processing time"));
        assert!(html.contains(r#"class="rating standout""#));
        assert!(html.contains("Back from a knee knock"));
    }

    #[test]
    fn test_model_text_is_escaped() {
        let mut result = derby();
        result.summary = "<img src=x onerror=alert(1)>".to_string();
        let html = result_page(&render(&result));
        assert!(!html.contains("<img src=x"));
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
    }

    #[test]
    fn test_zero_stats_render_zero_width() {
        let mut result = derby();
        result.stats.shots = [0.0, 0.0];
        let html = result_page(&render(&result));
        assert!(html.contains("width: 0.00%"));
        assert!(!html.contains("NaN"));
    }

    #[test]
    fn test_loading_page_disables_submit() {
        let request = SimulationRequest::new("Galatasaray", "Fenerbahçe", "2024-05-19");
        let html = loading_page(&request);
        assert!(html.contains(r#"<button type="submit" class="primary wide" disabled>"#));
        assert!(html.contains(r#"http-equiv="refresh""#));
    }

    #[test]
    fn test_idle_page_with_error_banner() {
        let html = idle_page(&FormValues::defaults("2024-05-19"), Some(SIMULATION_FAILED_MESSAGE));
        assert!(html.contains("Galatasaray"));
        assert!(html.contains(r#"value="2024-05-19""#));
        assert!(html.contains("error-banner"));
        assert!(html.contains(r#"action="/dismiss""#));
    }

    #[test]
    fn test_api_page_never_shows_key() {
        let config = AppConfig {
            api_key: Some("super-secret".to_string()),
            ..AppConfig::default()
        };
        let html = api_page(&config);
        assert!(!html.contains("super-secret"));
        assert!(html.contains("configured"));
        assert!(html.contains(GEMINI_KEY_DOCS_URL));
    }
}
