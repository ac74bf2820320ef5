//! Tag chat rooms over a publish/subscribe relay.
//!
//! Every [`Tag`] is a room with its own content topic. Messages are JSON
//! [`ChatMessage`]s carried as opaque payloads by a [`ChatTransport`].

pub mod relay;
pub mod rooms;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::users::types::Tag;

/// Longest accepted message body, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Move opaque payloads between this service and the pub/sub network.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;

    async fn subscribe(&self, topics: &[String]) -> Result<()>;

    /// Payloads received on `topic` since the previous call.
    async fn fetch(&self, topic: &str) -> Result<Vec<Vec<u8>>>;
}

/// Content topic for a tag room: `<prefix>/<tag>/json`.
pub fn room_topic(prefix: &str, tag: Tag) -> String {
    format!("{}/{}/json", prefix.trim_end_matches('/'), tag.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub room: Tag,
    /// Wallet address of the author.
    pub sender: String,
    pub text: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(room: Tag, sender: &str, text: &str) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            room,
            sender: sender.to_string(),
            text: text.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// `None` for payloads that are not chat messages.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        serde_json::from_slice(payload).ok()
    }
}
