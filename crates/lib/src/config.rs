//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.tombot/config.json`) and environment.
//! Environment variables keep the names used by the original deployment
//! (`CHANNEL_SECRET`, `PING_TOPIC_ARN`, `UNKNOWN_TOPIC_ARN`) and override file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::command::DEFAULT_PREFIX;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// LINE channel settings.
    #[serde(default)]
    pub line: LineConfig,

    /// Command prefix and topic table.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Where events are published.
    #[serde(default)]
    pub publisher: PublisherConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the webhook endpoint (default 15152).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    15152
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// LINE channel config.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineConfig {
    /// Channel secret for X-Line-Signature verification. Overridden by CHANNEL_SECRET env.
    pub channel_secret: Option<String>,
}

impl std::fmt::Debug for LineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineConfig")
            .field(
                "channel_secret",
                &self.channel_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Command prefix and topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    /// Literal prefix a text message must start with (default "tmb").
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Topic for the "ping" command. Overridden by PING_TOPIC_ARN env.
    pub ping_topic: Option<String>,

    /// Topic for every command without a route. Overridden by UNKNOWN_TOPIC_ARN env.
    pub unknown_topic: Option<String>,

    /// Extra command -> topic routes (exact, case-sensitive).
    #[serde(default)]
    pub routes: BTreeMap<String, String>,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            ping_topic: None,
            unknown_topic: None,
            routes: BTreeMap::new(),
        }
    }
}

/// How events reach the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherMode {
    /// POST each event to the bus HTTP endpoint.
    #[default]
    Http,

    /// Log instead of publishing (dry run).
    Log,
}

/// Publisher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherConfig {
    #[serde(default)]
    pub mode: PublisherMode,

    /// Base URL of the bus; events go to `{endpoint}/topics/{topic}`. Overridden by TOMBOT_PUBLISH_ENDPOINT env.
    pub endpoint: Option<String>,

    /// Per-publish timeout in seconds (default 10).
    #[serde(default = "default_publish_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_publish_timeout_secs() -> u64 {
    10
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            mode: PublisherMode::default(),
            endpoint: None,
            timeout_secs: default_publish_timeout_secs(),
        }
    }
}

/// Non-empty, trimmed value of an environment variable.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve the channel secret: env CHANNEL_SECRET overrides config.
pub fn resolve_channel_secret(config: &Config) -> Option<String> {
    env_value("CHANNEL_SECRET").or_else(|| trimmed(config.line.channel_secret.as_ref()))
}

/// Resolve the ping topic: env PING_TOPIC_ARN overrides config.
pub fn resolve_ping_topic(config: &Config) -> Option<String> {
    env_value("PING_TOPIC_ARN").or_else(|| trimmed(config.routing.ping_topic.as_ref()))
}

/// Resolve the fallback topic: env UNKNOWN_TOPIC_ARN overrides config.
pub fn resolve_unknown_topic(config: &Config) -> Option<String> {
    env_value("UNKNOWN_TOPIC_ARN").or_else(|| trimmed(config.routing.unknown_topic.as_ref()))
}

/// Resolve the bus endpoint: env TOMBOT_PUBLISH_ENDPOINT overrides config.
pub fn resolve_publish_endpoint(config: &Config) -> Option<String> {
    env_value("TOMBOT_PUBLISH_ENDPOINT").or_else(|| trimmed(config.publisher.endpoint.as_ref()))
}

/// Apply environment overrides once, at startup, so the rest of the process only sees `Config`.
pub fn apply_env_overrides(mut config: Config) -> Config {
    config.line.channel_secret = resolve_channel_secret(&config);
    config.routing.ping_topic = resolve_ping_topic(&config);
    config.routing.unknown_topic = resolve_unknown_topic(&config);
    config.publisher.endpoint = resolve_publish_endpoint(&config);
    config
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("TOMBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".tombot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default path). Missing file => default config.
/// Environment overrides are not applied here; see [`apply_env_overrides`].
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
