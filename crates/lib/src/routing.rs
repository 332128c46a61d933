//! Topic routing: command -> bus topic, with a fallback for anything unrecognised.
//!
//! The table is built once at startup and shared read-only across requests.

use crate::command::Command;
use crate::config::RoutingConfig;
use anyhow::Result;
use std::collections::HashMap;

/// Built-in command routed to the ping topic.
pub const PING_COMMAND: &str = "ping";

/// Static command -> topic mapping plus the fallback topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: HashMap<String, String>,
    fallback: String,
}

impl RoutingTable {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            routes: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    /// Add or replace the topic for an exact command.
    pub fn with_route(mut self, command: impl Into<String>, topic: impl Into<String>) -> Self {
        self.routes.insert(command.into(), topic.into());
        self
    }

    /// Build from resolved config. Both the ping and the fallback topic must be set.
    pub fn from_config(config: &RoutingConfig) -> Result<Self> {
        let fallback = non_blank(config.unknown_topic.as_deref()).ok_or_else(|| {
            anyhow::anyhow!("routing.unknownTopic (or UNKNOWN_TOPIC_ARN) is not set")
        })?;
        let ping = non_blank(config.ping_topic.as_deref()).ok_or_else(|| {
            anyhow::anyhow!("routing.pingTopic (or PING_TOPIC_ARN) is not set")
        })?;
        let mut table = Self::new(fallback).with_route(PING_COMMAND, ping);
        for (command, topic) in &config.routes {
            let Some(topic) = non_blank(Some(topic)) else {
                anyhow::bail!("routing.routes[{:?}] has an empty topic", command);
            };
            table = table.with_route(command.clone(), topic);
        }
        Ok(table)
    }

    /// Topic for `cmd`: exact, case-sensitive match, else the fallback. Never fails.
    pub fn resolve(&self, cmd: &Command) -> &str {
        self.routes
            .get(cmd.as_str())
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Number of explicitly mapped commands.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
