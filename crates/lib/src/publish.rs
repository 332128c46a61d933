//! Publishing events to message-bus topics.
//!
//! [`Publisher`] is the seam between dispatch and the bus transport. `HttpPublisher`
//! POSTs to a bus HTTP endpoint; `LogPublisher` only logs (dry run).

use crate::config::{Config, PublisherMode};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Why a publish failed. Not retried here; the caller decides.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("encoding event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("publishing to {topic}: {source}")]
    Transport {
        topic: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("publishing to {topic} rejected: {status} {body}")]
    Rejected {
        topic: String,
        status: u16,
        body: String,
    },
    #[error("invalid topic {0:?}")]
    InvalidTopic(String),
}

/// Deliver one serialized event to a named topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;
}

/// Publishes over HTTP: `POST {endpoint}/topics/{topic}` with the JSON payload as body.
#[derive(Clone)]
pub struct HttpPublisher {
    endpoint: reqwest::Url,
    client: reqwest::Client,
}

impl HttpPublisher {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = reqwest::Url::parse(endpoint)
            .with_context(|| format!("parsing publish endpoint {:?}", endpoint))?;
        if endpoint.cannot_be_a_base() {
            anyhow::bail!("publish endpoint {} cannot be used as a base URL", endpoint);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { endpoint, client })
    }

    /// URL for a topic; the topic is one percent-encoded path segment.
    pub fn topic_url(&self, topic: &str) -> Result<reqwest::Url, PublishError> {
        if topic.is_empty() {
            return Err(PublishError::InvalidTopic(topic.to_string()));
        }
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| PublishError::InvalidTopic(topic.to_string()))?
            .pop_if_empty()
            .push("topics")
            .push(topic);
        Ok(url)
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let url = self.topic_url(topic)?;
        let res = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|source| PublishError::Transport {
                topic: topic.to_string(),
                source,
            })?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                topic: topic.to_string(),
                status,
                body,
            });
        }
        log::debug!("published {} bytes to {}", payload.len(), topic);
        Ok(())
    }
}

/// Dry-run publisher: logs what would have been published.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        log::info!("dry run: would publish {} bytes to {}", payload.len(), topic);
        log::debug!("dry run payload: {}", String::from_utf8_lossy(payload));
        Ok(())
    }
}

/// Build the publisher selected by `publisher.mode`. Expects env overrides already applied.
pub fn publisher_from_config(config: &Config) -> Result<Arc<dyn Publisher>> {
    match config.publisher.mode {
        PublisherMode::Log => Ok(Arc::new(LogPublisher)),
        PublisherMode::Http => {
            let endpoint = config
                .publisher
                .endpoint
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "publisher.endpoint (or TOMBOT_PUBLISH_ENDPOINT) is required when publisher.mode is \"http\""
                    )
                })?;
            let timeout = Duration::from_secs(config.publisher.timeout_secs.max(1));
            Ok(Arc::new(HttpPublisher::new(endpoint, timeout)?))
        }
    }
}
