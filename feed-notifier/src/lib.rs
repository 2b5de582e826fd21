pub mod config;
pub mod dedup;
pub mod delivery;
pub mod fetcher;
pub mod monitor;
pub mod notifier;
pub mod parser;
pub mod scheduler;
pub mod sources;
pub mod state;
pub mod traits;
pub mod types;

pub use types::*;
pub use config::Settings;
pub use dedup::{partition, DedupOutcome, SeenSet};
pub use delivery::{HttpDelivery, LogDelivery};
pub use fetcher::Fetcher;
pub use monitor::{FeedMonitor, MonitorOptions};
pub use notifier::{format_message, format_recent, Notifier};
pub use parser::FeedParser;
pub use scheduler::Scheduler;
pub use sources::RssFeedSource;
pub use state::{StateStore, TrackingState};
pub use traits::{Deliver, FeedSource};
