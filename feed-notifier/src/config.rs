//! Runtime settings, read from CLI flags with environment fallbacks.

use crate::monitor::MonitorOptions;
use crate::scheduler::Scheduler;
use crate::state::{StateStore, DEFAULT_SEED_FEED};
use crate::types::{FetchConfig, NotifierError, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Path of the JSON tracking-state file
    #[arg(long, env = "DATA_FILE", default_value = "rss_bot_data.json")]
    pub data_file: PathBuf,

    /// Seconds between periodic checks
    #[arg(long, env = "CHECK_INTERVAL", default_value_t = 300)]
    pub check_interval: u64,

    /// Seconds before the first periodic check
    #[arg(long, env = "INITIAL_DELAY", default_value_t = 10)]
    pub initial_delay: u64,

    /// Per-feed fetch timeout in seconds
    #[arg(long, env = "FETCH_TIMEOUT", default_value_t = 30)]
    pub fetch_timeout: u64,

    /// Feeds fetched concurrently during a check
    #[arg(long, env = "MAX_CONCURRENT_FETCHES", default_value_t = 4)]
    pub max_concurrent_fetches: usize,

    /// User-Agent sent with feed requests
    #[arg(long, env = "USER_AGENT", default_value = "Feed-Notifier/1.0")]
    pub user_agent: String,

    /// Feed registered when no state file exists
    #[arg(long, env = "SEED_FEED", default_value = DEFAULT_SEED_FEED)]
    pub seed_feed: String,

    /// Endpoint receiving {"chat_id", "text"} POSTs; logs messages when unset
    #[arg(long, env = "DELIVERY_ENDPOINT")]
    pub delivery_endpoint: Option<String>,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.check_interval == 0 {
            return Err(NotifierError::Config(
                "check_interval must be > 0".to_string(),
            ));
        }
        if self.fetch_timeout == 0 {
            return Err(NotifierError::Config("fetch_timeout must be > 0".to_string()));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(NotifierError::Config(
                "max_concurrent_fetches must be > 0".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(NotifierError::Config("user_agent is empty".to_string()));
        }
        Ok(())
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.user_agent.clone(),
            timeout_seconds: self.fetch_timeout,
            ..FetchConfig::default()
        }
    }

    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            fetch_timeout: Duration::from_secs(self.fetch_timeout),
            max_concurrent_fetches: self.max_concurrent_fetches,
        }
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            Duration::from_secs(self.check_interval),
            Duration::from_secs(self.initial_delay),
        )
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(&self.data_file, &self.seed_feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = TestCli::parse_from(["test"]).settings;
        assert_eq!(settings.check_interval, 300);
        assert_eq!(settings.initial_delay, 10);
        assert_eq!(settings.seed_feed, DEFAULT_SEED_FEED);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let settings = TestCli::parse_from(["test", "--check-interval", "0"]).settings;
        assert!(matches!(settings.validate(), Err(NotifierError::Config(_))));
    }
}
