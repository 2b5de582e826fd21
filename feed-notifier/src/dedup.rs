//! Seen-set partitioning.
//!
//! [`partition`] is a pure function: it reads a snapshot of one source's seen
//! set and returns what the caller should apply. The monitor runs it inside
//! the state lock so the read and the write of a seen set are one step.

use crate::types::FeedItem;
use std::collections::HashSet;

/// Ids already notified for one source.
pub type SeenSet = HashSet<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    /// Items not present in the input seen set, in adapter order.
    pub new_items: Vec<FeedItem>,
    /// Input seen set plus the key of every fetched item.
    pub updated_seen: SeenSet,
    /// New items with neither id nor link.
    pub unidentifiable: usize,
}

/// Split `fetched` into new and already-seen items for one source.
///
/// An id repeated within the same fetch is reported once. Items with no
/// usable key share the empty key, so only the first such item is ever new.
pub fn partition(seen: &SeenSet, fetched: &[FeedItem]) -> DedupOutcome {
    let mut updated_seen = seen.clone();
    let mut new_items = Vec::new();
    let mut unidentifiable = 0;

    for item in fetched {
        let key = item.dedup_key();
        if !updated_seen.insert(key.to_string()) {
            continue;
        }
        if !item.is_identifiable() {
            unidentifiable += 1;
        }
        new_items.push(item.clone());
    }

    DedupOutcome {
        new_items,
        updated_seen,
        unidentifiable,
    }
}
