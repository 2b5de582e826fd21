mod common;

use common::*;
use feed_notifier::{Recipient, SeenSet, StateStore, TrackingState};

#[tokio::test]
async fn test_save_then_load_round_trips() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());

    let mut state = TrackingState::default();
    let seen: SeenSet = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    state.add_source("https://a.example.com/feed.xml", seen);
    state.add_source("https://b.example.com/feed.xml", SeenSet::new());
    state.register_recipient(Recipient::new("100"));
    state.register_recipient(Recipient::new("-200"));

    store.save(&state).await.unwrap();
    let loaded = store.try_load().await.unwrap().unwrap();

    assert_eq!(loaded, state);
    assert_eq!(
        loaded.feeds(),
        &[
            "https://a.example.com/feed.xml".to_string(),
            "https://b.example.com/feed.xml".to_string()
        ]
    );
}

#[tokio::test]
async fn test_missing_file_yields_seeded_default() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());

    assert!(store.try_load().await.unwrap().is_none());

    let state = store.load().await;
    assert_eq!(state.feeds(), &["https://seed.example.com/feed.xml".to_string()]);
    assert!(state.seen("https://seed.example.com/feed.xml").unwrap().is_empty());
    assert!(state.recipients().is_empty());
}

#[tokio::test]
async fn test_corrupt_file_falls_back_to_default() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    std::fs::write(store.path(), "{ this is not json").unwrap();

    assert!(store.try_load().await.is_err());

    let state = store.load().await;
    assert_eq!(state, store.default_state());
}

#[tokio::test]
async fn test_legacy_file_with_numeric_chat_ids_loads() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    std::fs::write(
        store.path(),
        r#"{
            "feeds": ["https://status.example.com/rss"],
            "seen_posts": {"https://status.example.com/rss": ["post-1", "post-2"]},
            "chat_ids": [123456789, -1001234567890]
        }"#,
    )
    .unwrap();

    let state = store.try_load().await.unwrap().unwrap();

    assert_eq!(state.seen("https://status.example.com/rss").unwrap().len(), 2);
    assert_eq!(
        state.recipients(),
        &[
            Recipient::new("123456789"),
            Recipient::new("-1001234567890")
        ]
    );
}

#[tokio::test]
async fn test_out_of_range_and_float_chat_ids_keep_state() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    std::fs::write(
        store.path(),
        r#"{
            "feeds": ["https://status.example.com/rss"],
            "seen_posts": {"https://status.example.com/rss": ["post-1"]},
            "chat_ids": [18446744073709551615, 42.5, "7"]
        }"#,
    )
    .unwrap();

    let state = store.try_load().await.unwrap().unwrap();

    assert_eq!(state.seen("https://status.example.com/rss").unwrap().len(), 1);
    assert_eq!(
        state.recipients(),
        &[
            Recipient::new("18446744073709551615"),
            Recipient::new("42.5"),
            Recipient::new("7")
        ]
    );
}

#[tokio::test]
async fn test_non_scalar_chat_id_is_a_load_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    std::fs::write(store.path(), r#"{"feeds": [], "chat_ids": [{"id": 1}]}"#).unwrap();

    assert!(store.try_load().await.is_err());
}

#[tokio::test]
async fn test_file_missing_sections_loads_with_empty_defaults() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    std::fs::write(store.path(), r#"{"feeds": ["https://a.example.com/feed.xml"]}"#).unwrap();

    let state = store.try_load().await.unwrap().unwrap();

    // The missing seen set is repaired on load.
    assert!(state.seen("https://a.example.com/feed.xml").unwrap().is_empty());
    assert!(state.recipients().is_empty());
}

#[tokio::test]
async fn test_save_leaves_no_temp_file_and_creates_parent() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("nested").join("data.json"), "https://seed");

    store.save(&store.default_state()).await.unwrap();
    store.save(&store.default_state()).await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path().join("nested"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["data.json".to_string()]);
}
