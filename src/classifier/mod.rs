//! Transcript → interest-tag classification.
//!
//! [`TagClassifier`] is the seam; [`llm::LlmClassifier`] is the production
//! implementation backed by a chat-completions API. [`parse_tags`] turns a free
//! form model reply into vocabulary tags.

pub mod llm;

use anyhow::Result;
use async_trait::async_trait;

use crate::users::types::{dedup_tags, Tag};

/// Classify a piece of transcript text into zero or more tags from `allowed`.
#[async_trait]
pub trait TagClassifier: Send + Sync {
    async fn classify(&self, text: &str, allowed: &[Tag]) -> Result<Vec<Tag>>;
}

/// Instruction sent ahead of every transcript.
pub fn system_prompt(allowed: &[Tag]) -> String {
    let vocabulary = allowed
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You label snippets of everyday conversation with the speaker's interests.\n\
         Allowed tags: {vocabulary}.\n\
         Reply with a JSON array containing only allowed tags that clearly apply, \
         for example [\"music\", \"travel\"]. Reply with [] if none apply. \
         Do not add any other text."
    )
}

/// Extract allowed tags from a model reply.
///
/// Prefers the first `[...]` slice of the reply that parses as a JSON array of
/// strings, so bracketed prose ahead of the array is skipped. If there is
/// none, the reply is split on commas and newlines. Unknown labels are
/// dropped and duplicates removed, keeping first-seen order.
pub fn parse_tags(reply: &str, allowed: &[Tag]) -> Vec<Tag> {
    let labels = json_array(reply).unwrap_or_else(|| {
        reply
            .split([',', '\n'])
            .map(|s| s.trim_matches(|c: char| c.is_whitespace() || "\"'-*[]`".contains(c)))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    });

    dedup_tags(
        labels
            .iter()
            .filter_map(|l| l.parse::<Tag>().ok())
            .filter(|t| allowed.contains(t)),
    )
}

fn json_array(reply: &str) -> Option<Vec<String>> {
    reply.match_indices('[').find_map(|(start, _)| {
        reply[start..]
            .match_indices(']')
            .find_map(|(end, _)| serde_json::from_str::<Vec<String>>(&reply[start..=start + end]).ok())
    })
}
