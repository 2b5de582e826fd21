use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// A single entry produced by a source adapter.
///
/// Only `id` outlives a fetch: it is what ends up in the per-source seen set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub link: String,
    /// Opaque, may be empty.
    pub published: String,
    /// Opaque, may be empty.
    pub summary: String,
}

impl FeedItem {
    /// Key used for deduplication: the explicit id, else the link.
    pub fn dedup_key(&self) -> &str {
        if self.id.is_empty() {
            &self.link
        } else {
            &self.id
        }
    }

    /// An item with neither id nor link cannot be tracked across cycles.
    pub fn is_identifiable(&self) -> bool {
        !self.dedup_key().is_empty()
    }
}

/// Opaque delivery target (for the Telegram transport, a chat id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Recipient(String);

impl Recipient {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Recipient {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// Older data files store chat ids as JSON numbers, possibly beyond i64 range.
impl<'de> Deserialize<'de> for Recipient {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Recipient(s)),
            serde_json::Value::Number(n) => Ok(Recipient(n.to_string())),
            other => Err(D::Error::custom(format!(
                "expected a string or number chat id, found {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Feed-Notifier/1.0".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

/// An item found new during a cycle, tagged with the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub source: String,
    pub item: FeedItem,
}

/// Result of `FeedMonitor::list_recent`; same shape as a new item but never
/// checked against the seen sets.
pub type RecentItem = NewItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub recipient: Recipient,
    pub error: String,
}

/// Summary of one poll cycle, for manual callers and for the scheduler log.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources_checked: usize,
    pub failed_sources: Vec<String>,
    pub new_items: Vec<NewItem>,
    /// Formatted notification text, one per entry of `new_items`.
    pub messages: Vec<String>,
    pub deliveries: usize,
    pub delivery_failures: Vec<DeliveryFailure>,
    pub unidentifiable_items: usize,
    pub persisted: bool,
}

impl CycleReport {
    pub fn new_item_count(&self) -> usize {
        self.new_items.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddSourceOutcome {
    /// Source registered; `existing_items` ids were pre-marked as seen.
    Added { existing_items: usize },
    AlreadyExists,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Source unavailable: {url}: {reason}")]
    SourceUnavailable { url: String, reason: String },

    #[error("Fetch of {url} timed out after {timeout:?}")]
    FetchTimeout { url: String, timeout: Duration },

    #[error("Feed {url} returned no items")]
    EmptyFeed { url: String },

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported URL scheme '{scheme}' (expected http or https)")]
    UnsupportedScheme { scheme: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Delivery to {recipient} failed: {reason}")]
    Delivery { recipient: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, NotifierError>;
