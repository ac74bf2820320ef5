use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FriendCircleConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub webhook: WebhookConfig,
    pub classifier: ClassifierConfig,
    pub archive: ArchiveConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebhookConfig {
    /// Segments per flushed batch.
    pub batch_size: usize,
    /// Sessions tracked before the least recently touched one is evicted.
    pub max_sessions: usize,
    /// Raw payloads kept for `GET /api/webhook`.
    pub recent_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ArchiveConfig {
    pub api_url: String,
    pub api_token: String,
    /// Gateway URL template; `{cid}` is replaced with the content identifier.
    pub gateway_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub relay_url: String,
    pub topic_prefix: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_data_dir()
            .join("friendcircle.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_sessions: 10,
            recent_capacity: 100,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.red-pill.ai/v1/chat/completions".into(),
            api_key: String::new(),
            model: "gpt-4o".into(),
            timeout_secs: 60,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.pinata.cloud/pinning/pinJSONToIPFS".into(),
            api_token: String::new(),
            gateway_url: "https://{cid}.ipfs.w3s.link".into(),
            timeout_secs: 60,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:8645".into(),
            topic_prefix: "/friendcircle/1".into(),
            timeout_secs: 10,
        }
    }
}

/// Returns `~/.friendcircle/`
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".friendcircle")
}

/// Returns the default config file path: `~/.friendcircle/config.toml`
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

impl FriendCircleConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            FriendCircleConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FRIENDCIRCLE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("FRIENDCIRCLE_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("FRIENDCIRCLE_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid FRIENDCIRCLE_PORT"),
            }
        }
        if let Ok(val) = std::env::var("FRIENDCIRCLE_LLM_API_KEY") {
            self.classifier.api_key = val;
        }
        if let Ok(val) = std::env::var("FRIENDCIRCLE_ARCHIVE_TOKEN") {
            self.archive.api_token = val;
        }
        if let Ok(val) = std::env::var("FRIENDCIRCLE_RELAY_URL") {
            self.chat.relay_url = val;
        }
    }

    /// Reject settings the webhook buffer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.webhook.batch_size == 0 {
            bail!("webhook.batch_size must be at least 1");
        }
        if self.webhook.max_sessions == 0 {
            bail!("webhook.max_sessions must be at least 1");
        }
        if !self.archive.gateway_url.contains("{cid}") {
            bail!("archive.gateway_url must contain a {{cid}} placeholder");
        }
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
