//! Poll coordinator and the operations exposed to a command transport.
//!
//! [`FeedMonitor`] owns the single [`TrackingState`] behind an async mutex.
//! A cycle runs in three phases:
//!
//! ```text
//! snapshot feeds ──► fetch all (no lock) ──► lock { dedup, apply, persist } ──► notify (no lock)
//! ```
//!
//! Because each source's seen set is read, partitioned and written back in
//! one critical section, two overlapping cycles can never both report the
//! same item as new.

use crate::dedup::{partition, SeenSet};
use crate::notifier::{format_message, Notifier};
use crate::state::{StateStore, TrackingState};
use crate::traits::FeedSource;
use crate::types::{
    AddSourceOutcome, CycleReport, FeedItem, NewItem, NotifierError, RecentItem, Recipient,
    Result,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

/// Items taken from each source before the global `list_recent` cut.
pub const RECENT_PER_SOURCE: usize = 10;

/// Default `limit` for `list_recent`.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Upper bound on a single source fetch.
    pub fetch_timeout: Duration,
    /// Sources fetched at once during a cycle.
    pub max_concurrent_fetches: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            max_concurrent_fetches: 4,
        }
    }
}

pub struct FeedMonitor {
    state: Mutex<TrackingState>,
    store: StateStore,
    source: Arc<dyn FeedSource>,
    notifier: Notifier,
    options: MonitorOptions,
}

impl FeedMonitor {
    pub fn new(
        state: TrackingState,
        store: StateStore,
        source: Arc<dyn FeedSource>,
        notifier: Notifier,
        options: MonitorOptions,
    ) -> Self {
        Self {
            state: Mutex::new(state),
            store,
            source,
            notifier,
            options,
        }
    }

    /// Build a monitor from whatever the store holds (or its defaults).
    pub async fn load(
        store: StateStore,
        source: Arc<dyn FeedSource>,
        notifier: Notifier,
        options: MonitorOptions,
    ) -> Self {
        let state = store.load().await;
        info!(
            "Loaded tracking state: {} feeds, {} recipients",
            state.feeds().len(),
            state.recipients().len()
        );
        Self::new(state, store, source, notifier, options)
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> TrackingState {
        self.state.lock().await.clone()
    }

    pub async fn list_sources(&self) -> Vec<String> {
        self.state.lock().await.feeds().to_vec()
    }

    pub async fn recipients(&self) -> Vec<Recipient> {
        self.state.lock().await.recipients().to_vec()
    }

    /// Idempotent. Returns `true` when the recipient is new.
    pub async fn register_recipient(&self, recipient: Recipient) -> bool {
        let mut state = self.state.lock().await;
        if !state.register_recipient(recipient.clone()) {
            debug!("Recipient {} already registered", recipient);
            return false;
        }
        info!("Registered recipient {}", recipient);
        self.persist(&state).await;
        true
    }

    /// Validate `url` with one fetch and start tracking it.
    ///
    /// Everything the feed currently lists is marked seen, so the first cycle
    /// after adding does not replay the feed's history. On fetch failure the
    /// source is not added and the error is returned.
    pub async fn add_source(&self, url: &str) -> Result<AddSourceOutcome> {
        if self.state.lock().await.contains_source(url) {
            return Ok(AddSourceOutcome::AlreadyExists);
        }

        validate_feed_url(url)?;

        let items = self.fetch_with_timeout(url).await?;
        if items.is_empty() {
            return Err(NotifierError::EmptyFeed {
                url: url.to_string(),
            });
        }

        let seen: SeenSet = items.iter().map(|i| i.dedup_key().to_string()).collect();

        let mut state = self.state.lock().await;
        // Another caller may have added it while we were fetching.
        if !state.add_source(url, seen) {
            return Ok(AddSourceOutcome::AlreadyExists);
        }
        self.persist(&state).await;

        info!("Added feed {} ({} existing items marked seen)", url, items.len());
        Ok(AddSourceOutcome::Added {
            existing_items: items.len(),
        })
    }

    /// Stop tracking `url`. Returns whether it was registered.
    pub async fn remove_source(&self, url: &str) -> bool {
        let mut state = self.state.lock().await;
        if !state.remove_source(url) {
            debug!("Remove requested for unknown feed {}", url);
            return false;
        }
        self.persist(&state).await;
        info!("Removed feed {}", url);
        true
    }

    /// Manual trigger: one full cycle, same path as the scheduler.
    pub async fn check_now(&self) -> CycleReport {
        self.run_cycle().await
    }

    /// One pass over every feed registered when the cycle starts.
    ///
    /// Never fails: unavailable sources, delivery errors and persistence
    /// errors are logged and reflected in the report.
    pub async fn run_cycle(&self) -> CycleReport {
        let run_id = Uuid::new_v4();
        self.cycle(run_id)
            .instrument(info_span!("poll_cycle", %run_id))
            .await
    }

    async fn cycle(&self, run_id: Uuid) -> CycleReport {
        let started_at = Utc::now();
        let sources = self.list_sources().await;
        info!("Checking {} feeds", sources.len());

        let fetched = self.fetch_all(&sources).await;

        let mut failed_sources = Vec::new();
        let mut new_items = Vec::new();
        let mut unidentifiable_items = 0;

        let (persisted, recipients) = {
            let mut state = self.state.lock().await;

            for (url, result) in fetched {
                let items = match result {
                    Ok(items) => items,
                    Err(e) => {
                        warn!("Skipping feed {}: {}", url, e);
                        failed_sources.push(url);
                        continue;
                    }
                };

                let Some(seen) = state.seen(&url) else {
                    debug!("Feed {} was removed during the cycle, discarding results", url);
                    continue;
                };

                let outcome = partition(seen, &items);
                if outcome.unidentifiable > 0 {
                    warn!(
                        "Feed {} returned {} items without id or link; they cannot be deduplicated reliably",
                        url, outcome.unidentifiable
                    );
                }
                debug!(
                    "Feed {}: {} fetched, {} new",
                    url,
                    items.len(),
                    outcome.new_items.len()
                );

                unidentifiable_items += outcome.unidentifiable;
                state.replace_seen(&url, outcome.updated_seen);
                new_items.extend(outcome.new_items.into_iter().map(|item| NewItem {
                    source: url.clone(),
                    item,
                }));
            }

            let persisted = self.persist(&state).await;
            (persisted, state.recipients().to_vec())
        };

        let mut messages = Vec::with_capacity(new_items.len());
        let mut deliveries = 0;
        let mut delivery_failures = Vec::new();

        for new_item in &new_items {
            let message = format_message(&new_item.item);
            let failures = self.notifier.notify(&recipients, &message).await;
            deliveries += recipients.len() - failures.len();
            delivery_failures.extend(failures);
            messages.push(message);
        }

        let report = CycleReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            sources_checked: sources.len(),
            failed_sources,
            new_items,
            messages,
            deliveries,
            delivery_failures,
            unidentifiable_items,
            persisted,
        };

        info!(
            new_items = report.new_item_count(),
            failed_sources = report.failed_sources.len(),
            deliveries = report.deliveries,
            delivery_failures = report.delivery_failures.len(),
            persisted = report.persisted,
            "Cycle complete"
        );
        report
    }

    /// Fresh items from every feed, without touching any seen set.
    ///
    /// Takes up to [`RECENT_PER_SOURCE`] per feed in registration order, then
    /// keeps the first `limit` overall.
    pub async fn list_recent(&self, limit: usize) -> Vec<RecentItem> {
        let sources = self.list_sources().await;
        let mut recent = Vec::new();

        for (url, result) in self.fetch_all(&sources).await {
            match result {
                Ok(items) => recent.extend(items.into_iter().take(RECENT_PER_SOURCE).map(
                    |item| RecentItem {
                        source: url.clone(),
                        item,
                    },
                )),
                Err(e) => warn!("Skipping feed {} in recent listing: {}", url, e),
            }
        }

        recent.truncate(limit);
        recent
    }

    /// Fetch every url with bounded concurrency; results keep input order.
    async fn fetch_all(&self, urls: &[String]) -> Vec<(String, Result<Vec<FeedItem>>)> {
        let concurrency = self.options.max_concurrent_fetches.max(1);

        stream::iter(urls.iter().cloned())
            .map(|url| async move {
                let result = self.fetch_with_timeout(&url).await;
                (url, result)
            })
            .buffered(concurrency)
            .collect()
            .await
    }

    async fn fetch_with_timeout(&self, url: &str) -> Result<Vec<FeedItem>> {
        let timeout = self.options.fetch_timeout;
        match tokio::time::timeout(timeout, self.source.fetch_items(url)).await {
            Ok(result) => result,
            Err(_) => Err(NotifierError::FetchTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    /// Save, logging rather than propagating failure.
    async fn persist(&self, state: &TrackingState) -> bool {
        match self.store.save(state).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Error saving state to {}: {}",
                    self.store.path().display(),
                    e
                );
                false
            }
        }
    }
}

/// Accept only absolute http(s) URLs.
pub fn validate_feed_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(NotifierError::UnsupportedScheme {
            scheme: parsed.scheme().to_string(),
        });
    }
    Ok(())
}
