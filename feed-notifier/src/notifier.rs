use crate::traits::Deliver;
use crate::types::{DeliveryFailure, FeedItem, Recipient, RecentItem};
use std::sync::Arc;
use tracing::{debug, error};

/// Summaries longer than this many characters are cut.
pub const SUMMARY_LIMIT: usize = 500;

/// Appended to a summary that was cut.
pub const TRUNCATION_MARKER: &str = "...";

/// Render the notification text for one new item.
pub fn format_message(item: &FeedItem) -> String {
    let mut message = format!(
        "🔔 New Post Alert!\n\n📰 {}\n\n🔗 {}\n\n",
        item.title, item.link
    );

    if !item.published.is_empty() {
        message.push_str(&format!("📅 {}\n\n", item.published));
    }

    if !item.summary.is_empty() {
        message.push_str(&truncate_summary(&item.summary));
    }

    message
}

/// First [`SUMMARY_LIMIT`] characters, plus the marker if anything was cut.
pub fn truncate_summary(summary: &str) -> String {
    match summary.char_indices().nth(SUMMARY_LIMIT) {
        Some((cut, _)) => format!("{}{}", &summary[..cut], TRUNCATION_MARKER),
        None => summary.to_string(),
    }
}

/// Render a numbered listing of recent items.
pub fn format_recent(items: &[RecentItem]) -> String {
    let mut message = format!("📋 Last {} Posts:\n\n", items.len());

    for (i, recent) in items.iter().enumerate() {
        message.push_str(&format!("{}. {}\n", i + 1, recent.item.title));
        message.push_str(&format!("   🔗 {}\n", recent.item.link));
        if !recent.item.published.is_empty() {
            message.push_str(&format!("   📅 {}\n", recent.item.published));
        }
        message.push('\n');
    }

    message
}

/// Fans one message out to every recipient.
///
/// A failed delivery is logged and recorded; it never stops delivery to the
/// remaining recipients and is not retried.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn Deliver>,
}

impl Notifier {
    pub fn new(transport: Arc<dyn Deliver>) -> Self {
        Self { transport }
    }

    pub async fn notify(&self, recipients: &[Recipient], message: &str) -> Vec<DeliveryFailure> {
        let mut failures = Vec::new();

        for recipient in recipients {
            match self.transport.deliver(recipient, message).await {
                Ok(()) => debug!(
                    recipient = %recipient,
                    transport = self.transport.name(),
                    "Delivered notification"
                ),
                Err(e) => {
                    error!("Error sending message to {}: {}", recipient, e);
                    failures.push(DeliveryFailure {
                        recipient: recipient.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        failures
    }
}
