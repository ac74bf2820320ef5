//! User record and interest-tag vocabulary.
//!
//! [`Tag`] is the closed set of interest labels a user can carry, [`User`] is the
//! hydrated record, and [`WalletAddress`] is a validated, lowercased EVM address.

use serde::{Deserialize, Serialize};

/// One interest label from the fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tag {
    Anime,
    Football,
    Cricket,
    Art,
    Therapy,
    Music,
    Travel,
    Food,
    Gardening,
    Dance,
    Tech,
    Web3,
    ShowsMovies,
    NightLife,
    Gaming,
    Student,
}

impl Tag {
    /// Every tag, in vocabulary order.
    pub const ALL: [Tag; 16] = [
        Tag::Anime,
        Tag::Football,
        Tag::Cricket,
        Tag::Art,
        Tag::Therapy,
        Tag::Music,
        Tag::Travel,
        Tag::Food,
        Tag::Gardening,
        Tag::Dance,
        Tag::Tech,
        Tag::Web3,
        Tag::ShowsMovies,
        Tag::NightLife,
        Tag::Gaming,
        Tag::Student,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anime => "anime",
            Self::Football => "football",
            Self::Cricket => "cricket",
            Self::Art => "art",
            Self::Therapy => "therapy",
            Self::Music => "music",
            Self::Travel => "travel",
            Self::Food => "food",
            Self::Gardening => "gardening",
            Self::Dance => "dance",
            Self::Tech => "tech",
            Self::Web3 => "web3",
            Self::ShowsMovies => "shows-movies",
            Self::NightLife => "night-life",
            Self::Gaming => "gaming",
            Self::Student => "student",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Tag::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| format!("unknown tag: {s}"))
    }
}

/// Parse a list of raw labels, failing on the first unknown one.
pub fn parse_tags<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Tag>, String> {
    raw.iter().map(|s| s.as_ref().parse()).collect()
}

/// Drop repeated tags, keeping first occurrences in order.
pub fn dedup_tags(tags: impl IntoIterator<Item = Tag>) -> Vec<Tag> {
    let mut out: Vec<Tag> = Vec::new();
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// A `0x`-prefixed, 20-byte hex wallet address, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for WalletAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| format!("wallet address must start with 0x: {s}"))?;
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("wallet address must be 40 hex digits: {s}"));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }
}

/// A user record, matching the `users` table plus its tags and CIDs.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub uid: String,
    #[serde(rename = "walletAddress")]
    pub wallet_address: Option<String>,
    #[serde(rename = "isSetupCompleted")]
    pub is_setup_completed: bool,
    /// Interest tags in the order they were first added.
    pub tags: Vec<Tag>,
    /// Archived conversation CIDs, oldest first.
    pub conversation_cids: Vec<String>,
    /// RFC 3339 creation timestamp.
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// RFC 3339 last-modification timestamp.
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}
