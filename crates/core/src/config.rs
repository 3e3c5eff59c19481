use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub webhook: WebhookConfig,
    pub messenger: MessengerConfig,
    #[serde(default)]
    pub takeover: TakeoverConfig,
    #[serde(default)]
    pub dedupe: DedupeConfig,
    pub catalog: CatalogConfig,
    pub leads: LeadsConfig,
    pub vision: VisionConfig,
    pub responder: ResponderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebhookConfig {
    /// Shared secret echoed back during the platform's subscription handshake.
    pub verify_token: String,
    /// App secret for HMAC body signatures. Unset disables the check.
    #[serde(default)]
    pub app_secret: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MessengerConfig {
    #[serde(default)]
    pub api_base: Option<String>,
    /// Fallback token used when no per-page token is configured.
    pub default_token: String,
    /// Per-page access tokens, keyed by page id.
    #[serde(default)]
    pub page_tokens: HashMap<String, String>,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

fn default_token_ttl_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TakeoverConfig {
    #[serde(default = "default_takeover_ttl_minutes")]
    pub ttl_minutes: u64,
}

impl Default for TakeoverConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_takeover_ttl_minutes(),
        }
    }
}

fn default_takeover_ttl_minutes() -> u64 {
    8
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DedupeConfig {
    #[serde(default = "default_max_tracked")]
    pub max_tracked: usize,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            max_tracked: default_max_tracked(),
        }
    }
}

fn default_max_tracked() -> usize {
    1000
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatalogConfig {
    pub api_base: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LeadsConfig {
    pub api_base: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VisionConfig {
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResponderConfig {
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl AppConfig {
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_path = if let Some(path) = custom_path {
            path
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".tindabot/config.json")
        };

        let s = Config::builder()
            .add_source(File::from(config_path).required(true))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_sections() {
        let raw = serde_json::json!({
            "webhook": { "verify_token": "secret" },
            "messenger": { "default_token": "tok" },
            "catalog": { "api_base": "http://localhost:8080" },
            "leads": { "api_base": "http://localhost:8081" },
            "vision": { "api_base": "http://localhost:8082" },
            "responder": { "api_base": "http://localhost:8083" }
        });
        let cfg: AppConfig = serde_json::from_value(raw).expect("config");
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.takeover.ttl_minutes, 8);
        assert_eq!(cfg.dedupe.max_tracked, 1000);
        assert_eq!(cfg.messenger.token_ttl_secs, 60);
        assert!(cfg.webhook.app_secret.is_none());
    }
}
