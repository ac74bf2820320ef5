//! REST client for a pub/sub relay node's auto-sharding endpoints.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chat::ChatTransport;
use crate::config::ChatConfig;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayMessage {
    payload: String,
    content_topic: String,
    /// Unix nanoseconds.
    #[serde(default)]
    timestamp: Option<i64>,
}

pub struct RelayTransport {
    client: reqwest::Client,
    base: reqwest::Url,
}

impl RelayTransport {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to create HTTP client")?;
        let base = reqwest::Url::parse(&config.relay_url)
            .with_context(|| format!("invalid relay url {}", config.relay_url))?;
        Ok(Self { client, base })
    }

    /// `<base>/relay/v1/auto/<segments...>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("relay url cannot be a base: {}", self.base))?
            .pop_if_empty()
            .extend(["relay", "v1", "auto"])
            .extend(segments);
        Ok(url)
    }
}

fn encode_message(topic: &str, payload: &[u8]) -> RelayMessage {
    RelayMessage {
        payload: STANDARD.encode(payload),
        content_topic: topic.to_string(),
        timestamp: chrono::Utc::now().timestamp_nanos_opt(),
    }
}

fn decode_messages(topic: &str, messages: Vec<RelayMessage>) -> Vec<Vec<u8>> {
    messages
        .into_iter()
        .filter(|m| m.content_topic == topic)
        .filter_map(|m| match STANDARD.decode(&m.payload) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!(topic, error = %e, "skipping payload that is not base64");
                None
            }
        })
        .collect()
}

#[async_trait]
impl ChatTransport for RelayTransport {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let url = self.endpoint(&["messages"])?;
        let response = self
            .client
            .post(url)
            .json(&encode_message(topic, payload))
            .send()
            .await
            .context("relay publish request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("relay publish returned HTTP {status}: {body}");
        }
        Ok(())
    }

    async fn subscribe(&self, topics: &[String]) -> Result<()> {
        let url = self.endpoint(&["subscriptions"])?;
        let response = self
            .client
            .post(url)
            .json(topics)
            .send()
            .await
            .context("relay subscribe request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("relay subscribe returned HTTP {status}");
        }
        tracing::info!(count = topics.len(), "subscribed to room topics");
        Ok(())
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<Vec<u8>>> {
        let url = self.endpoint(&["messages", topic])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("relay fetch request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("relay fetch returned HTTP {status}");
        }
        let messages: Vec<RelayMessage> =
            response.json().await.context("failed to parse relay messages")?;
        Ok(decode_messages(topic, messages))
    }
}
