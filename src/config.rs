use crate::types::*;
use chrono::Local;
use std::{
  env,
  fs,
  io::Write,
  path::PathBuf,
};

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn config_path() -> PathBuf {
  if let Some(raw) = env_default("SIMULATOR_CONFIG_PATH") {
    return PathBuf::from(raw);
  }
  repo_root().join("config.json")
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn parse_flag(raw: &str) -> Option<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" => Some(false),
    _ => None,
  }
}

pub fn env_flag_true_default(key: &str, default: bool) -> bool {
  env::var(key)
    .ok()
    .and_then(|value| parse_flag(&value))
    .unwrap_or(default)
}

/// Overlays environment values onto a config. The API key is only ever
/// taken from here.
pub fn apply_env_defaults(mut config: AppConfig) -> AppConfig {
  if let Some(value) = env_default("GEMINI_MODEL") {
    config.model = value;
  }
  if let Some(value) = env_default("GEMINI_API_BASE_URL") {
    config.api_base_url = value;
  }
  if let Some(value) = env_default("SIMULATOR_ADDR") {
    config.bind_addr = value;
  }
  if let Some(value) = env_default("NARRATIVE_LANGUAGE") {
    config.narrative_language = value;
  }
  config.live_search = env_flag_true_default("GEMINI_LIVE_SEARCH", config.live_search);
  config.api_key = env_default("GEMINI_API_KEY").or_else(|| env_default("API_KEY"));
  config
}

pub fn parse_config(data: &str) -> Result<AppConfig, String> {
  let mut config = serde_json::from_str::<AppConfig>(data).map_err(|e| e.to_string())?;
  if config.model.trim().is_empty() {
    config.model = GEMINI_DEFAULT_MODEL.to_string();
  }
  if config.api_base_url.trim().is_empty() {
    config.api_base_url = GEMINI_API_BASE_URL.to_string();
  }
  if config.bind_addr.trim().is_empty() {
    config.bind_addr = DEFAULT_BIND_ADDR.to_string();
  }
  if config.narrative_language.trim().is_empty() {
    config.narrative_language = DEFAULT_NARRATIVE_LANGUAGE.to_string();
  }
  Ok(config)
}

pub fn load_config_inner() -> Result<AppConfig, String> {
  let path = config_path();
  if !path.is_file() {
    return Ok(apply_env_defaults(AppConfig::default()));
  }
  let data = fs::read_to_string(&path).map_err(|e| format!("read config {}: {e}", path.display()))?;
  let config = parse_config(&data).map_err(|e| format!("parse config {}: {e}", path.display()))?;
  Ok(apply_env_defaults(config))
}

pub fn load_env_file() {
  let env_path = repo_root().join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

pub fn gemini_log_path() -> PathBuf {
  repo_root().join("logs").join("gemini_api.log")
}

pub fn append_gemini_log(label: &str, payload: &str) {
  let dir = repo_root().join("logs");
  if fs::create_dir_all(&dir).is_err() {
    return;
  }
  let path = gemini_log_path();
  let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
  let entry = format!("[{timestamp}] {label}\n{payload}\n\n");
  if let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(&path) {
    let _ = file.write_all(entry.as_bytes());
  }
}

pub fn log_env_warnings(config: &AppConfig) {
  if !config.has_api_key() {
    tracing::warn!("GEMINI_API_KEY not set (nor API_KEY); every simulation will fail until it is provided");
  }
  if !config.live_search {
    tracing::warn!("Live search disabled; rosters will come from the model's training data only");
  }
}
