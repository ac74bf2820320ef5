use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

use crate::chat::{room_topic, ChatMessage, MAX_MESSAGE_CHARS};
use crate::users::types::Tag;

/// Messages kept per room.
pub const HISTORY_PER_ROOM: usize = 200;

/// A room as listed to a member.
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub tag: Tag,
    pub topic: String,
    pub members: usize,
}

/// Every room topic, in vocabulary order.
pub fn all_topics(prefix: &str) -> Vec<String> {
    Tag::ALL.iter().map(|t| room_topic(prefix, *t)).collect()
}

/// Trimmed message text, or an error if empty or too long.
pub fn validate_text(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        bail!("message text must not be empty");
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        bail!("message text exceeds {MAX_MESSAGE_CHARS} characters");
    }
    Ok(text)
}

/// Recent messages per room, merged from the relay as they are fetched.
///
/// The relay hands out each payload once, so everything read is kept here
/// (bounded per room) to serve later readers.
#[derive(Debug, Default)]
pub struct RoomHistory {
    rooms: HashMap<Tag, VecDeque<ChatMessage>>,
}

impl RoomHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add decoded payloads for `room`. Messages for other rooms and repeated
    /// ids are skipped. Returns how many were added.
    pub fn absorb(&mut self, room: Tag, payloads: &[Vec<u8>]) -> usize {
        let history = self.rooms.entry(room).or_default();
        let mut added = 0;
        for msg in payloads.iter().filter_map(|p| ChatMessage::decode(p)) {
            if msg.room != room || history.iter().any(|m| m.id == msg.id) {
                continue;
            }
            history.push_back(msg);
            added += 1;
        }
        history.make_contiguous().sort_by_key(|m| m.timestamp);
        while history.len() > HISTORY_PER_ROOM {
            history.pop_front();
        }
        added
    }

    /// Messages in `room`, oldest first, at most `limit` of the newest.
    pub fn recent(&self, room: Tag, limit: usize) -> Vec<ChatMessage> {
        let Some(history) = self.rooms.get(&room) else {
            return Vec::new();
        };
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }
}
