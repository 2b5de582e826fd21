use crate::dedup::SeenSet;
use crate::types::{Recipient, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Feed seeded into a fresh state.
pub const DEFAULT_SEED_FEED: &str =
    "https://status.aws.amazon.com/rss/multipleservices-us-east-1.rss";

/// Everything that survives a restart: the unit of persistence.
///
/// Every entry of `feeds` has a (possibly empty) seen set, and no seen set
/// exists without its feed. The mutators below keep that pairing intact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    #[serde(default)]
    feeds: Vec<String>,
    #[serde(default, serialize_with = "serialize_seen_posts")]
    seen_posts: HashMap<String, SeenSet>,
    #[serde(default)]
    chat_ids: Vec<Recipient>,
}

impl TrackingState {
    pub fn with_seed(seed_feed: &str) -> Self {
        let mut state = Self::default();
        state.add_source(seed_feed, SeenSet::new());
        state
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.chat_ids
    }

    pub fn contains_source(&self, url: &str) -> bool {
        self.seen_posts.contains_key(url)
    }

    pub fn seen(&self, url: &str) -> Option<&SeenSet> {
        self.seen_posts.get(url)
    }

    /// Register `url` with an initial seen set. Returns `false` (and leaves
    /// the state untouched) when the source is already registered.
    pub fn add_source(&mut self, url: &str, initial_seen: SeenSet) -> bool {
        if self.contains_source(url) {
            return false;
        }
        self.feeds.push(url.to_string());
        self.seen_posts.insert(url.to_string(), initial_seen);
        true
    }

    /// Drop `url` together with its seen set. Returns whether it existed.
    pub fn remove_source(&mut self, url: &str) -> bool {
        let existed = self.seen_posts.remove(url).is_some();
        self.feeds.retain(|f| f != url);
        existed
    }

    /// Returns `true` if the recipient was not known before.
    pub fn register_recipient(&mut self, recipient: Recipient) -> bool {
        if self.chat_ids.contains(&recipient) {
            return false;
        }
        self.chat_ids.push(recipient);
        true
    }

    /// Swap in a new seen set for a registered source.
    ///
    /// Returns `false` if the source was removed in the meantime; the update
    /// is then discarded so no orphaned entry is created.
    pub fn replace_seen(&mut self, url: &str, seen: SeenSet) -> bool {
        match self.seen_posts.get_mut(url) {
            Some(entry) => {
                *entry = seen;
                true
            }
            None => false,
        }
    }

    /// Restore the feed/seen-set pairing on data read from disk.
    ///
    /// Collapses duplicate feeds, creates missing seen sets and drops seen
    /// sets with no feed. Returns how many fixes were applied.
    pub fn repair(&mut self) -> usize {
        let mut fixes = 0;

        let mut listed = HashSet::new();
        let before = self.feeds.len();
        self.feeds.retain(|f| listed.insert(f.clone()));
        fixes += before - self.feeds.len();

        for feed in &self.feeds {
            if !self.seen_posts.contains_key(feed) {
                self.seen_posts.insert(feed.clone(), SeenSet::new());
                fixes += 1;
            }
        }

        let before = self.seen_posts.len();
        self.seen_posts.retain(|url, _| listed.contains(url));
        fixes += before - self.seen_posts.len();

        let mut recipients = HashSet::new();
        let before = self.chat_ids.len();
        self.chat_ids.retain(|r| recipients.insert(r.clone()));
        fixes += before - self.chat_ids.len();

        fixes
    }
}

// Sorted output keeps the data file diffable between saves.
fn serialize_seen_posts<S>(
    seen_posts: &HashMap<String, SeenSet>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let sorted: BTreeMap<&String, Vec<&String>> = seen_posts
        .iter()
        .map(|(url, ids)| {
            let mut ids: Vec<&String> = ids.iter().collect();
            ids.sort();
            (url, ids)
        })
        .collect();
    sorted.serialize(serializer)
}

/// JSON file persistence for [`TrackingState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    seed_feed: String,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>, seed_feed: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            seed_feed: seed_feed.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_state(&self) -> TrackingState {
        TrackingState::with_seed(&self.seed_feed)
    }

    /// Load state, falling back to the seeded default on any failure.
    pub async fn load(&self) -> TrackingState {
        match self.try_load().await {
            Ok(Some(state)) => state,
            Ok(None) => {
                info!(
                    "No state file at {}, starting with defaults",
                    self.path.display()
                );
                self.default_state()
            }
            Err(e) => {
                error!(
                    "Error loading state from {}: {}. Starting with defaults",
                    self.path.display(),
                    e
                );
                self.default_state()
            }
        }
    }

    /// Strict variant of [`load`](Self::load): `Ok(None)` when no file exists.
    pub async fn try_load(&self) -> Result<Option<TrackingState>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut state: TrackingState = serde_json::from_str(&content)?;
        let fixes = state.repair();
        if fixes > 0 {
            warn!(
                "Repaired {} inconsistencies in state file {}",
                fixes,
                self.path.display()
            );
        }

        debug!(
            "Loaded state: {} feeds, {} recipients",
            state.feeds().len(),
            state.recipients().len()
        );
        Ok(Some(state))
    }

    /// Write state via a temp file and rename so a crash never leaves a
    /// half-written file behind.
    pub async fn save(&self, state: &TrackingState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
