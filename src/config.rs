//! Board engine configuration.
//!
//! Layered like the daemon config: explicit values from the embedder win,
//! then `BOARDSYNC_*` environment variables, then an optional TOML file,
//! then built-in defaults.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_PUSH_URL: &str = "ws://127.0.0.1:3001";
const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;
const DEFAULT_RECONNECT_DELAY_MAX_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Base URL of the board REST API.
    pub api_base_url: String,
    /// WebSocket URL of the push notification channel.
    pub push_url: String,
    /// Initial reconnect delay for the push channel.
    pub reconnect_delay_ms: u64,
    /// Reconnect delay ceiling (the delay doubles up to this).
    pub reconnect_delay_max_ms: u64,
}

/// TOML file layer — every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TomlConfig {
    api_base_url: Option<String>,
    push_url: Option<String>,
    reconnect_delay_ms: Option<u64>,
    reconnect_delay_max_ms: Option<u64>,
}

impl BoardConfig {
    /// Build config from explicit values + env + optional TOML file.
    pub fn new(
        api_base_url: Option<String>,
        push_url: Option<String>,
        config_file: Option<&Path>,
    ) -> Self {
        let toml = config_file.and_then(load_toml).unwrap_or_default();

        let api_base_url = api_base_url
            .or_else(|| std::env::var("BOARDSYNC_API_URL").ok().filter(|s| !s.is_empty()))
            .or(toml.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let push_url = push_url
            .or_else(|| std::env::var("BOARDSYNC_PUSH_URL").ok().filter(|s| !s.is_empty()))
            .or(toml.push_url)
            .unwrap_or_else(|| DEFAULT_PUSH_URL.to_string());

        Self {
            api_base_url,
            push_url,
            reconnect_delay_ms: toml
                .reconnect_delay_ms
                .unwrap_or(DEFAULT_RECONNECT_DELAY_MS),
            reconnect_delay_max_ms: toml
                .reconnect_delay_max_ms
                .unwrap_or(DEFAULT_RECONNECT_DELAY_MAX_MS),
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

fn load_toml(path: &Path) -> Option<TomlConfig> {
    let text = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&text) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), "ignoring malformed config file: {e}");
            None
        }
    }
}
