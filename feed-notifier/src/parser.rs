use crate::types::{FeedItem, NotifierError, Result};
use feed_rs::model::{Entry, Link, Text};
use feed_rs::parser;
use tracing::debug;

const DEFAULT_TITLE: &str = "No title";

/// Normalizes RSS/Atom/JSON feeds into [`FeedItem`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_items(&self, content: &str) -> Result<Vec<FeedItem>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        // feed-rs would otherwise hash link + title into a synthetic id; an
        // entry without an id must fall back to its link instead.
        let feed = parser::Builder::new()
            .id_generator(link_as_id)
            .build()
            .parse(content.as_bytes())
            .map_err(|e| NotifierError::Parse(format!("Failed to parse feed: {}", e)))?;

        let items: Vec<FeedItem> = feed.entries.into_iter().map(Self::normalize).collect();

        debug!("Parsed feed with {} entries", items.len());
        Ok(items)
    }

    fn normalize(entry: Entry) -> FeedItem {
        let link = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default();

        let title = entry
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let published = entry
            .published
            .map(|dt| dt.to_rfc2822())
            .unwrap_or_default();

        // RSS <description> lands in `summary`; fall back to the content body.
        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        let id = if entry.id.is_empty() {
            link.clone()
        } else {
            entry.id
        };

        FeedItem {
            id,
            title,
            link,
            published,
            summary,
        }
    }
}

fn link_as_id(links: &[Link], _title: &Option<Text>, _uri: Option<&str>) -> String {
    links.first().map(|l| l.href.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rss_items_in_feed_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Status</title>
    <item>
      <title>Increased error rates</title>
      <link>https://status.example.com/1</link>
      <guid>incident-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
      <description>We are investigating.</description>
    </item>
    <item>
      <title>Resolved</title>
      <link>https://status.example.com/2</link>
      <guid>incident-2</guid>
    </item>
  </channel>
</rss>"#;

        let items = FeedParser::new().parse_items(xml).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "incident-1");
        assert_eq!(items[0].title, "Increased error rates");
        assert_eq!(items[0].link, "https://status.example.com/1");
        assert_eq!(items[0].summary, "We are investigating.");
        assert!(!items[0].published.is_empty());

        assert_eq!(items[1].id, "incident-2");
        assert!(items[1].published.is_empty());
        assert!(items[1].summary.is_empty());
    }

    #[test]
    fn missing_guid_falls_back_to_link_on_every_parse() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>t</title>
    <item>
      <title>No GUID</title>
      <link>https://example.com/no-guid</link>
    </item>
  </channel>
</rss>"#;

        let first = FeedParser::new().parse_items(xml).unwrap();
        let second = FeedParser::new().parse_items(xml).unwrap();

        assert_eq!(first[0].id, "https://example.com/no-guid");
        assert_eq!(first[0].id, second[0].id);
    }

    #[test]
    fn missing_title_uses_placeholder() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>t</title>
    <item><guid>g1</guid></item>
  </channel>
</rss>"#;

        let items = FeedParser::new().parse_items(xml).unwrap();
        assert_eq!(items[0].title, "No title");
    }

    #[test]
    fn rejects_garbage() {
        let result = FeedParser::new().parse_items("this is not a feed");
        assert!(matches!(result, Err(NotifierError::Parse(_))));
    }
}
