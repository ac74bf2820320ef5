//! Archival of conversation batches to content-addressed storage.
//!
//! [`ArchiveStore`] uploads JSON documents and fetches them back by CID.
//! [`pinning::PinningArchive`] talks to a JSON pinning service and reads
//! content through a public gateway.

pub mod pinning;

use anyhow::{bail, Result};
use async_trait::async_trait;

/// Upload and retrieve JSON documents by content identifier.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Store `content` under the display name `name`. Returns its CID.
    async fn upload(&self, name: &str, content: &serde_json::Value) -> Result<String>;

    /// Fetch a previously uploaded document.
    async fn fetch(&self, cid: &str) -> Result<serde_json::Value>;

    /// Public URL for `cid`.
    fn url_for(&self, cid: &str) -> String;
}

/// Substitute `cid` into a gateway template such as `https://{cid}.ipfs.w3s.link`.
pub fn gateway_url(template: &str, cid: &str) -> String {
    template.replace("{cid}", cid)
}

/// CIDs are base-encoded multihashes; anything with other characters is
/// rejected before it reaches a URL.
pub fn validate_cid(cid: &str) -> Result<()> {
    if cid.is_empty() || !cid.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("invalid content identifier: {cid:?}");
    }
    Ok(())
}

/// Display name used for a user's archived conversations.
pub fn conversations_file_name(uid: &str) -> String {
    format!("{uid}-conversations.json")
}
