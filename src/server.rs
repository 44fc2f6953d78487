use crate::config::*;
use crate::pages::{about_page, api_page, idle_page, loading_page, result_page, FormValues};
use crate::prompt::validate_request;
use crate::render::render;
use crate::simulation::SimulationClient;
use crate::state::SimulatorState;
use crate::types::*;

use axum::{
    extract::State as AxumState,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, get_service, post},
    Form, Router,
};
use chrono::Local;
use serde::Deserialize;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

const NO_CACHE_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-store"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

#[derive(Clone)]
pub struct SimulatorServerState {
    pub simulator: SharedSimulator,
    pub client: SimulationClient,
    pub config: Arc<AppConfig>,
}

impl SimulatorServerState {
    pub fn new(config: AppConfig, client: SimulationClient) -> Self {
        SimulatorServerState {
            simulator: Arc::new(Mutex::new(SimulatorState::default())),
            client,
            config: Arc::new(config),
        }
    }

    fn snapshot(&self) -> SimulatorState {
        self.simulator.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct SimulateForm {
    #[serde(default)]
    pub home: String,
    #[serde(default)]
    pub away: String,
    #[serde(default)]
    pub date: String,
}

pub fn static_dir() -> PathBuf {
    match env_default("STATIC_DIR") {
        Some(raw) => {
            let path = PathBuf::from(raw);
            if path.is_absolute() {
                path
            } else {
                repo_root().join(path)
            }
        }
        None => repo_root().join("static"),
    }
}

fn today_string() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

pub fn simulator_router(state: SimulatorServerState, static_dir: PathBuf) -> Router {
    let static_files = get_service(ServeDir::new(static_dir));

    Router::new()
        .route("/", get(get_index))
        .route("/simulate", post(post_simulate))
        .route("/reset", post(post_reset))
        .route("/dismiss", post(post_dismiss))
        .route("/about", get(get_about))
        .route("/api-info", get(get_api_info))
        .route("/state.json", get(get_state_json))
        .nest_service("/static", static_files)
        .with_state(state)
}

pub async fn start_server(state: SimulatorServerState, static_dir: PathBuf) {
    let addr = state.config.bind_addr.clone();
    let app = simulator_router(state, static_dir);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Simulator server failed to bind {addr}: {e}");
            return;
        }
    };
    info!("Simulator listening at http://{addr}/");
    if let Err(e) = axum::serve(listener, app).await {
        error!("Simulator server error: {e}");
    }
}

/// Runs the call in the background. Only this task writes the outcome back.
pub fn spawn_simulation(state: &SimulatorServerState, request: SimulationRequest) -> JoinHandle<()> {
    let simulator = state.simulator.clone();
    let client = state.client.clone();
    tokio::spawn(async move {
        let outcome = client.simulate(&request).await;
        let mut guard = simulator.lock().unwrap_or_else(|e| e.into_inner());
        let applied = match outcome {
            Ok(result) => guard.succeed(result),
            Err(e) => {
                if e.is_malformed() {
                    error!(home = %request.home_team, away = %request.away_team, "Model response rejected: {e}");
                } else {
                    error!(kind = e.kind(), home = %request.home_team, away = %request.away_team, "Simulation failed: {e}");
                }
                guard.fail(SIMULATION_FAILED_MESSAGE)
            }
        };
        if let Err(e) = applied {
            warn!("Dropped simulation outcome: {e}");
        }
    })
}

async fn get_index(AxumState(state): AxumState<SimulatorServerState>) -> impl IntoResponse {
    let page = match state.snapshot() {
        SimulatorState::Idle => idle_page(&FormValues::defaults(&today_string()), None),
        SimulatorState::Loading { request } => loading_page(&request),
        SimulatorState::ShowingResult { result } => result_page(&render(&result)),
        SimulatorState::ShowingError { message } => {
            idle_page(&FormValues::defaults(&today_string()), Some(&message))
        }
    };
    (NO_CACHE_HEADERS, Html(page))
}

async fn post_simulate(
    AxumState(state): AxumState<SimulatorServerState>,
    Form(form): Form<SimulateForm>,
) -> Response {
    let request = SimulationRequest::new(form.home.trim(), form.away.trim(), form.date.trim());
    let mut guard = state.simulator.lock().unwrap_or_else(|e| e.into_inner());

    if let SimulatorState::Loading { request: pending } = &*guard {
        let page = loading_page(pending);
        return (StatusCode::CONFLICT, NO_CACHE_HEADERS, Html(page)).into_response();
    }
    if let Err(e) = validate_request(&request) {
        warn!("Rejected simulation form: {e}");
        let _ = guard.reject_input(e.to_string());
        return Redirect::to("/").into_response();
    }
    if let Err(e) = guard.submit(request.clone()) {
        warn!("Submit refused: {e}");
        return Redirect::to("/").into_response();
    }
    drop(guard);

    spawn_simulation(&state, request);
    Redirect::to("/").into_response()
}

async fn post_reset(AxumState(state): AxumState<SimulatorServerState>) -> Redirect {
    let mut guard = state.simulator.lock().unwrap_or_else(|e| e.into_inner());
    if let Err(e) = guard.reset() {
        info!("Reset ignored: {e}");
    }
    Redirect::to("/")
}

async fn post_dismiss(AxumState(state): AxumState<SimulatorServerState>) -> Redirect {
    state.simulator.lock().unwrap_or_else(|e| e.into_inner()).dismiss_error();
    Redirect::to("/")
}

async fn get_about() -> Html<String> {
    Html(about_page())
}

async fn get_api_info(AxumState(state): AxumState<SimulatorServerState>) -> Html<String> {
    Html(api_page(&state.config))
}

async fn get_state_json(AxumState(state): AxumState<SimulatorServerState>) -> impl IntoResponse {
    let body = serde_json::to_string(&state.snapshot()).unwrap_or_else(|_| "{}".to_string());
    (
        [
            ("Content-Type", "application/json"),
            ("Cache-Control", "no-store"),
            ("Pragma", "no-cache"),
            ("Expires", "0"),
        ],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExternalCallError;
    use crate::simulation::tests::{derby_payload, FixedModel};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn server_state(model: Arc<FixedModel>) -> SimulatorServerState {
        let config = AppConfig::default();
        let client = SimulationClient::new(model, &config);
        SimulatorServerState::new(config, client)
    }

    fn form_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(state: &SimulatorServerState, request: Request<Body>) -> (StatusCode, String) {
        let response = simulator_router(state.clone(), static_dir()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    async fn get(state: &SimulatorServerState, uri: &str) -> (StatusCode, String) {
        send(state, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn wait_until_settled(state: &SimulatorServerState) {
        for _ in 0..200 {
            if !state.snapshot().is_loading() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("simulation never settled");
    }

    #[tokio::test]
    async fn test_idle_index_shows_form() {
        let state = server_state(FixedModel::text(derby_payload().to_string()));
        let (status, body) = get(&state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"action="/simulate""#));
        assert!(body.contains(DEFAULT_HOME_TEAM));
    }

    #[tokio::test]
    async fn test_submit_then_result() {
        let model = FixedModel::text(derby_payload().to_string());
        let state = server_state(model.clone());
        let (status, _) = send(
            &state,
            form_request("/simulate", "home=Galatasaray&away=Fenerbah%C3%A7e&date=2024-05-19"),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        wait_until_settled(&state).await;

        let (_, json) = get(&state, "/state.json").await;
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "result");
        assert_eq!(value["result"]["homeScore"], 2);

        let (_, page) = get(&state, "/").await;
        assert!(page.contains("Live commentary"));
        assert!(page.contains("New simulation"));
        assert_eq!(model.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_external_failure_shows_single_message() {
        let model = FixedModel::failing(ExternalCallError::Provider {
            status: 403,
            message: "PERMISSION_DENIED".to_string(),
        });
        let state = server_state(model);
        send(&state, form_request("/simulate", "home=A&away=B&date=2024-05-19")).await;
        wait_until_settled(&state).await;

        let (_, page) = get(&state, "/").await;
        assert!(page.contains("Please try again."));
        assert!(!page.contains("PERMISSION_DENIED"));

        send(&state, form_request("/dismiss", "")).await;
        assert_eq!(state.snapshot(), SimulatorState::Idle);
    }

    #[tokio::test]
    async fn test_malformed_response_shows_same_message() {
        let state = server_state(FixedModel::text("not json"));
        send(&state, form_request("/simulate", "home=A&away=B&date=2024-05-19")).await;
        wait_until_settled(&state).await;
        assert_eq!(
            state.snapshot(),
            SimulatorState::ShowingError { message: SIMULATION_FAILED_MESSAGE.to_string() }
        );
    }

    #[tokio::test]
    async fn test_invalid_form_never_calls_model() {
        let model = FixedModel::text(derby_payload().to_string());
        let state = server_state(model.clone());
        let (status, _) = send(&state, form_request("/simulate", "home=&away=B&date=2024-05-19")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(state.snapshot().label(), "error");
        assert!(model.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_submit_while_loading_conflicts() {
        let model = FixedModel::text(derby_payload().to_string());
        let state = server_state(model.clone());
        state
            .simulator
            .lock()
            .unwrap()
            .submit(SimulationRequest::new("A", "B", "2024-05-19"))
            .unwrap();
        let (status, body) = send(&state, form_request("/simulate", "home=C&away=D&date=2024-05-19")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("disabled"));
        assert!(model.calls.lock().unwrap().is_empty());

        send(&state, form_request("/reset", "")).await;
        assert!(state.snapshot().is_loading());
    }

    #[tokio::test]
    async fn test_static_views() {
        let state = server_state(FixedModel::text("{}"));
        let (status, about) = get(&state, "/about").await;
        assert_eq!(status, StatusCode::OK);
        assert!(about.contains("About the project"));
        let (_, api) = get(&state, "/api-info").await;
        assert!(api.contains(GEMINI_DEFAULT_MODEL));
    }
}
