use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::archive::{gateway_url, validate_cid, ArchiveStore};
use crate::config::ArchiveConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinRequest<'a> {
    pinata_content: &'a serde_json::Value,
    pinata_metadata: PinMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct PinMetadata<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinResponse {
    ipfs_hash: String,
}

/// JSON pinning-service client with gateway reads.
pub struct PinningArchive {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    gateway: String,
}

impl PinningArchive {
    pub fn new(config: &ArchiveConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to create HTTP client")?;
        if config.api_token.is_empty() {
            tracing::warn!("archive api_token is empty; uploads will likely be rejected");
        }
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
            gateway: config.gateway_url.clone(),
        })
    }
}

fn parse_pin_response(body: &str) -> Result<String> {
    let response: PinResponse =
        serde_json::from_str(body).context("failed to parse pinning response")?;
    validate_cid(&response.ipfs_hash)?;
    Ok(response.ipfs_hash)
}

#[async_trait]
impl ArchiveStore for PinningArchive {
    async fn upload(&self, name: &str, content: &serde_json::Value) -> Result<String> {
        let request = PinRequest {
            pinata_content: content,
            pinata_metadata: PinMetadata { name },
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("upload request to {} failed", self.api_url))?;

        let status = response.status();
        let body = response.text().await.context("failed to read upload response")?;
        if !status.is_success() {
            bail!("pinning service returned HTTP {status}: {body}");
        }

        let cid = parse_pin_response(&body)?;
        tracing::info!(name, cid = %cid, "document pinned");
        Ok(cid)
    }

    async fn fetch(&self, cid: &str) -> Result<serde_json::Value> {
        validate_cid(cid)?;
        let url = self.url_for(cid);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("gateway request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("gateway returned HTTP {status} for {cid}");
        }
        let bytes = response.bytes().await.context("failed to read gateway response")?;
        serde_json::from_slice(&bytes).with_context(|| format!("content at {cid} is not JSON"))
    }

    fn url_for(&self, cid: &str) -> String {
        gateway_url(&self.gateway, cid)
    }
}
