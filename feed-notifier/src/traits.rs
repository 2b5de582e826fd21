use crate::types::{FeedItem, Recipient, Result};
use async_trait::async_trait;

/// Source adapter: turns a feed URL into normalized items.
///
/// Implementations are stateless and do not retry. The monitor wraps every
/// call in its own timeout, so a hung source only costs one cycle.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the current contents of `url`.
    ///
    /// Items come back in feed-defined order; callers never reorder them.
    async fn fetch_items(&self, url: &str) -> Result<Vec<FeedItem>>;
}

/// Outbound transport for notification text.
#[async_trait]
pub trait Deliver: Send + Sync {
    /// Send `message` to a single recipient.
    async fn deliver(&self, recipient: &Recipient, message: &str) -> Result<()>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
