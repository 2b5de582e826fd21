use crate::traits::FeedSource;
use crate::types::{FeedItem, FetchConfig, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use tracing::info;

/// HTTP-backed source adapter: one GET, one parse, no state between calls.
pub struct RssFeedSource {
    fetcher: Fetcher,
    parser: FeedParser,
}

impl RssFeedSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
            parser: FeedParser::new(),
        })
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch_items(&self, url: &str) -> Result<Vec<FeedItem>> {
        let content = self.fetcher.fetch_body(url).await?;
        let items = self.parser.parse_items(&content)?;

        info!("Pulled {} items from feed {}", items.len(), url);
        Ok(items)
    }
}
