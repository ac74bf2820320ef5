//! Per-session segment accumulation with fixed-size flushing.
//!
//! Sessions are keyed by uid and session id together, so two users posting
//! under the same session id never share pending segments. They live only for
//! the process lifetime. Once more than `max_sessions` are tracked, the least
//! recently touched one is evicted along with any segments it had not yet
//! flushed.

use std::collections::HashMap;

use crate::transcript::types::Segment;

/// A flushed slice of one session, ready for classification and archiving.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub uid: String,
    pub session_id: String,
    pub segments: Vec<Segment>,
}

impl Batch {
    /// Segment texts joined with single spaces.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

type SessionKey = (String, String);

#[derive(Debug)]
struct Session {
    pending: Vec<Segment>,
    touched: u64,
}

/// Outcome of one [`SessionBuffer::ingest`] call.
#[derive(Debug, Default)]
pub struct IngestResult {
    pub batches: Vec<Batch>,
    /// Session ids evicted to stay under the cap, with the segments they dropped.
    pub evicted: Vec<(String, usize)>,
}

#[derive(Debug)]
pub struct SessionBuffer {
    batch_size: usize,
    max_sessions: usize,
    clock: u64,
    sessions: HashMap<SessionKey, Session>,
}

impl SessionBuffer {
    /// Both limits are clamped to at least 1.
    pub fn new(batch_size: usize, max_sessions: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            max_sessions: max_sessions.max(1),
            clock: 0,
            sessions: HashMap::new(),
        }
    }

    /// Append the non-blank `segments` to the `(uid, session_id)` session, then
    /// cut off every full batch from the front of it.
    pub fn ingest(&mut self, uid: &str, session_id: &str, segments: Vec<Segment>) -> IngestResult {
        self.clock += 1;
        let stamp = self.clock;

        let session = self
            .sessions
            .entry((uid.to_string(), session_id.to_string()))
            .or_insert_with(|| Session {
                pending: Vec::new(),
                touched: stamp,
            });
        session.touched = stamp;
        session
            .pending
            .extend(segments.into_iter().filter(|s| !s.is_blank()));

        let mut batches = Vec::new();
        while session.pending.len() >= self.batch_size {
            let rest = session.pending.split_off(self.batch_size);
            let slice = std::mem::replace(&mut session.pending, rest);
            batches.push(Batch {
                uid: uid.to_string(),
                session_id: session_id.to_string(),
                segments: slice,
            });
        }

        let evicted = self.evict_over_capacity();
        IngestResult { batches, evicted }
    }

    fn evict_over_capacity(&mut self) -> Vec<(String, usize)> {
        let mut evicted = Vec::new();
        while self.sessions.len() > self.max_sessions {
            let Some(oldest) = self
                .sessions
                .iter()
                .min_by_key(|(_, s)| s.touched)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            if let Some(session) = self.sessions.remove(&oldest) {
                let (uid, session_id) = oldest;
                tracing::warn!(
                    uid = %uid,
                    session_id = %session_id,
                    dropped = session.pending.len(),
                    "evicting least recently touched session"
                );
                evicted.push((session_id, session.pending.len()));
            }
        }
        evicted
    }

    /// Number of sessions currently tracked.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Unflushed segments held for `uid` under `session_id`.
    pub fn pending(&self, uid: &str, session_id: &str) -> usize {
        self.sessions
            .get(&(uid.to_string(), session_id.to_string()))
            .map(|s| s.pending.len())
            .unwrap_or(0)
    }

    pub fn contains(&self, uid: &str, session_id: &str) -> bool {
        self.sessions
            .contains_key(&(uid.to_string(), session_id.to_string()))
    }
}
