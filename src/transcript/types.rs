use serde::{Deserialize, Serialize};

/// One utterance as reported by the voice assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub speaker_id: i64,
    #[serde(default)]
    pub is_user: bool,
    #[serde(default)]
    pub person_id: Option<String>,
    /// Seconds from session start.
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
}

impl Segment {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Body of a real-time transcript webhook call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptPayload {
    pub session_id: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}
