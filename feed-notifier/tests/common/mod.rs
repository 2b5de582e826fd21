#![allow(dead_code)]

use async_trait::async_trait;
use feed_notifier::{
    Deliver, FeedItem, FeedMonitor, FeedSource, MonitorOptions, Notifier, NotifierError,
    Recipient, Result, StateStore, TrackingState,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn item(id: &str) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        title: format!("Post {}", id),
        link: format!("https://example.com/posts/{}", id),
        published: String::new(),
        summary: String::new(),
    }
}

pub fn items(ids: &[&str]) -> Vec<FeedItem> {
    ids.iter().map(|id| item(id)).collect()
}

#[derive(Clone)]
enum FakeFeed {
    Items(Vec<FeedItem>),
    Fail,
    Hang,
}

/// Scriptable in-memory source adapter.
#[derive(Default)]
pub struct FakeSource {
    feeds: Mutex<HashMap<String, FakeFeed>>,
    delay: Duration,
    fetches: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps this long first, to make cycles overlap.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn set_items(&self, url: &str, items: Vec<FeedItem>) {
        self.feeds
            .lock()
            .unwrap()
            .insert(url.to_string(), FakeFeed::Items(items));
    }

    pub fn fail(&self, url: &str) {
        self.feeds
            .lock()
            .unwrap()
            .insert(url.to_string(), FakeFeed::Fail);
    }

    pub fn hang(&self, url: &str) {
        self.feeds
            .lock()
            .unwrap()
            .insert(url.to_string(), FakeFeed::Hang);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for FakeSource {
    async fn fetch_items(&self, url: &str) -> Result<Vec<FeedItem>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let feed = self.feeds.lock().unwrap().get(url).cloned();
        match feed {
            Some(FakeFeed::Items(items)) => Ok(items),
            Some(FakeFeed::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            Some(FakeFeed::Fail) | None => Err(NotifierError::SourceUnavailable {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

/// Records every delivery; recipients in `failing` always error.
#[derive(Default)]
pub struct RecordingDelivery {
    sent: Mutex<Vec<(Recipient, String)>>,
    failing: HashSet<Recipient>,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|r| Recipient::new(*r)).collect(),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(Recipient, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(r, _)| r.as_str() == recipient)
            .map(|(_, m)| m)
            .collect()
    }
}

#[async_trait]
impl Deliver for RecordingDelivery {
    async fn deliver(&self, recipient: &Recipient, message: &str) -> Result<()> {
        if self.failing.contains(recipient) {
            return Err(NotifierError::Delivery {
                recipient: recipient.to_string(),
                reason: "chat not found".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.clone(), message.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// State with the given feeds (empty seen sets) and recipients.
pub fn state_with(feeds: &[&str], recipients: &[&str]) -> TrackingState {
    let mut state = TrackingState::default();
    for feed in feeds {
        state.add_source(feed, Default::default());
    }
    for recipient in recipients {
        state.register_recipient(Recipient::new(*recipient));
    }
    state
}

pub fn store_in(dir: &Path) -> StateStore {
    StateStore::new(dir.join("state.json"), "https://seed.example.com/feed.xml")
}

pub fn build_monitor(
    state: TrackingState,
    store: StateStore,
    source: Arc<FakeSource>,
    delivery: Arc<RecordingDelivery>,
) -> FeedMonitor {
    build_monitor_with(state, store, source, delivery, MonitorOptions::default())
}

pub fn build_monitor_with(
    state: TrackingState,
    store: StateStore,
    source: Arc<FakeSource>,
    delivery: Arc<RecordingDelivery>,
    options: MonitorOptions,
) -> FeedMonitor {
    FeedMonitor::new(state, store, source, Notifier::new(delivery), options)
}
