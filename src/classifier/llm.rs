//! Chat-completions backed [`TagClassifier`].

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::classifier::{parse_tags, system_prompt, TagClassifier};
use crate::config::ClassifierConfig;
use crate::users::types::Tag;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Option<Vec<Choice>>,
    error: Option<CompletionError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionError {
    message: String,
}

pub struct LlmClassifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl LlmClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to create HTTP client")?;
        if config.api_key.is_empty() {
            tracing::warn!("classifier api_key is empty; completions will likely be rejected");
        }
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn request_body<'a>(&'a self, text: &str, allowed: &[Tag]) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(allowed),
                },
                ChatMessage {
                    role: "user",
                    content: text.to_string(),
                },
            ],
            temperature: 0.0,
        }
    }
}

/// Pull the reply text out of a completions response body.
fn reply_content(body: &str) -> Result<String> {
    let response: CompletionResponse =
        serde_json::from_str(body).context("failed to parse completion response")?;
    if let Some(error) = response.error {
        bail!("completion API error: {}", error.message);
    }
    response
        .choices
        .and_then(|choices| choices.into_iter().next())
        .and_then(|choice| choice.message.content)
        .context("completion response had no content")
}

#[async_trait]
impl TagClassifier for LlmClassifier {
    async fn classify(&self, text: &str, allowed: &[Tag]) -> Result<Vec<Tag>> {
        if text.trim().is_empty() || allowed.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(text, allowed))
            .send()
            .await
            .with_context(|| format!("completion request to {} failed", self.api_url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read completion response")?;
        if !status.is_success() {
            bail!("completion API returned HTTP {status}: {body}");
        }

        let reply = reply_content(&body)?;
        let tags = parse_tags(&reply, allowed);
        tracing::debug!(model = %self.model, reply_len = reply.len(), tags = tags.len(), "transcript classified");
        Ok(tags)
    }
}
