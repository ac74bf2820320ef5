use serde::Serialize;
use std::collections::VecDeque;

use crate::transcript::types::Segment;

/// A raw webhook payload as it was received.
#[derive(Debug, Clone, Serialize)]
pub struct RecentPayload {
    pub uid: Option<String>,
    pub session_id: String,
    pub segments: Vec<Segment>,
    /// Receive time, Unix milliseconds.
    pub timestamp: i64,
}

/// Bounded log of the most recent payloads, oldest first.
#[derive(Debug)]
pub struct RecentWebhooks {
    capacity: usize,
    entries: VecDeque<RecentPayload>,
}

impl RecentWebhooks {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn push(&mut self, entry: RecentPayload) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<RecentPayload> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
