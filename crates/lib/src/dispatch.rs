//! Dispatch: route each prefixed text message in a request to its topic and publish it.
//!
//! Events are handled one at a time in arrival order. The first publish failure stops the
//! request; events already published stay published (a retried request may duplicate them).

use crate::channels::InboundEvent;
use crate::command::extract_command;
use crate::config::RoutingConfig;
use crate::publish::{PublishError, Publisher};
use crate::routing::RoutingTable;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Routes and publishes the events of one webhook request.
#[derive(Clone)]
pub struct Dispatcher {
    prefix: String,
    table: Arc<RoutingTable>,
    publisher: Arc<dyn Publisher>,
}

impl Dispatcher {
    pub fn new(
        prefix: impl Into<String>,
        table: Arc<RoutingTable>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            table,
            publisher,
        }
    }

    /// Validate the routing config (non-empty prefix, required topics) and build a dispatcher.
    pub fn from_config(config: &RoutingConfig, publisher: Arc<dyn Publisher>) -> Result<Self> {
        if config.prefix.is_empty() {
            anyhow::bail!("routing.prefix must not be empty");
        }
        let table = RoutingTable::from_config(config).context("building routing table")?;
        Ok(Self::new(config.prefix.clone(), Arc::new(table), publisher))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Topic the event would be published to, or None when it carries no command.
    pub fn route(&self, event: &InboundEvent) -> Option<&str> {
        extract_command(event, &self.prefix).map(|cmd| self.table.resolve(&cmd))
    }

    /// Publish every command-bearing event in order; stop at the first failure.
    pub async fn dispatch(&self, events: &[InboundEvent]) -> Result<(), PublishError> {
        let mut published = 0usize;
        for (i, event) in events.iter().enumerate() {
            let Some(cmd) = extract_command(event, &self.prefix) else {
                log::debug!("event {}: {} carries no command, skipping", i, event.kind_name());
                continue;
            };
            let topic = self.table.resolve(&cmd);
            log::debug!("event {}: command {:?} -> {}", i, cmd.as_str(), topic);
            let payload = serde_json::to_vec(event)?;
            if let Err(e) = self.publisher.publish(topic, &payload).await {
                log::warn!(
                    "event {} of {}: publish to {} failed after {} published: {}",
                    i + 1,
                    events.len(),
                    topic,
                    published,
                    e
                );
                return Err(e);
            }
            published += 1;
        }
        log::debug!("dispatched {} of {} event(s)", published, events.len());
        Ok(())
    }
}
