pub mod types;
pub mod error;
pub mod config;
pub mod prompt;
pub mod gemini;
pub mod simulation;
pub mod render;
pub mod state;
pub mod pages;
pub mod server;

use config::*;
use gemini::{GeminiClient, GenerativeModel};
use server::{start_server, static_dir, SimulatorServerState};
use simulation::SimulationClient;
use types::AppConfig;

use std::{fs, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ── Entry point ────────────────────────────────────────────────────────

pub async fn run() {
    load_env_file();

    // Initialize tracing with daily-rolled file output
    let logs_dir = repo_root().join("logs");
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Football simulator starting");

    let config = load_config_inner().unwrap_or_else(|e| {
        error!("{e}; using defaults");
        apply_env_defaults(AppConfig::default())
    });
    log_env_warnings(&config);
    info!(model = %config.model, language = %config.narrative_language, live_search = config.live_search, "Config loaded");

    let model: Arc<dyn GenerativeModel> = Arc::new(GeminiClient::new(&config));
    let client = SimulationClient::new(model, &config);
    let state = SimulatorServerState::new(config, client);
    start_server(state, static_dir()).await;
}
