//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.hookchat/config.json`). The
//! webhook URL and the proxy flag are caller-managed settings: the delivery
//! core only ever sees the values it is handed per send.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook destination settings.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Destination URL and relay preference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Destination webhook URL. Overridden by HOOKCHAT_WEBHOOK_URL env when set.
    pub url: Option<String>,

    /// Route requests through the CORS relays. Defaults to true; direct mode
    /// only works when the destination answers with permissive CORS headers.
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
}

fn default_use_proxy() -> bool {
    true
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            use_proxy: default_use_proxy(),
        }
    }
}

/// Resolve the webhook URL: env HOOKCHAT_WEBHOOK_URL overrides config.
pub fn resolve_webhook_url(config: &Config) -> Option<String> {
    std::env::var("HOOKCHAT_WEBHOOK_URL")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .webhook
                .url
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("HOOKCHAT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".hookchat").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Session identity file: `session.json` next to the config file.
pub fn session_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join("session.json")
}

/// Load config from the default path (or HOOKCHAT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving sibling files).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Write the config as pretty JSON, creating the config directory if needed.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }
    let s = serde_json::to_string_pretty(config).context("serializing config")?;
    std::fs::write(path, s).with_context(|| format!("writing config to {}", path.display()))?;
    Ok(())
}
