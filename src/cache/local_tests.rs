use std::time::Duration;

use serde_json::json;

use super::local::LocalStore;
use super::store::{CacheEntry, CacheStore, Expiration};

fn entry(key: &str, tag: Option<&str>, expiry: Expiration) -> CacheEntry {
    CacheEntry::new(
        key,
        tag.map(str::to_string),
        json!({ "key": key }),
        expiry,
    )
}

#[tokio::test]
async fn test_set_then_get() {
    let store = LocalStore::new();
    let original = entry(
        "Order:7:Tenant:3",
        Some("Orders"),
        Expiration::absolute(Duration::from_secs(60)),
    );

    store.set(original.clone()).await.unwrap();

    let found = store.get("Order:7:Tenant:3").await.unwrap().unwrap();
    assert_eq!(found, original);
    assert!(store.get("Order:8:Tenant:3").await.unwrap().is_none());
}

#[tokio::test]
async fn test_remove_by_tag_leaves_other_tags_untouched() {
    let store = LocalStore::new();
    store
        .set(entry(
            "Order:1",
            Some("Orders"),
            Expiration::absolute(Duration::from_secs(60)),
        ))
        .await
        .unwrap();
    store
        .set(entry(
            "Order:2",
            Some("Orders"),
            Expiration::absolute(Duration::from_secs(60)),
        ))
        .await
        .unwrap();
    store
        .set(entry(
            "Invoice:1",
            Some("Invoices"),
            Expiration::absolute(Duration::from_secs(60)),
        ))
        .await
        .unwrap();

    store.remove_by_tag("Orders").await.unwrap();

    assert!(store.get("Order:1").await.unwrap().is_none());
    assert!(store.get("Order:2").await.unwrap().is_none());
    assert!(store.get("Invoice:1").await.unwrap().is_some());
    assert!(store.keys_for_tag("Orders").is_empty());
}

#[tokio::test]
async fn test_untagged_entries_survive_any_sweep() {
    let store = LocalStore::new();
    store
        .set(entry(
            "Order:1",
            None,
            Expiration::absolute(Duration::from_secs(60)),
        ))
        .await
        .unwrap();

    store.remove_by_tag("Orders").await.unwrap();
    assert!(store.get("Order:1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_absolute_expiry_fires_regardless_of_reads() {
    let store = LocalStore::new();
    store
        .set(entry(
            "Order:1",
            None,
            Expiration::absolute(Duration::from_millis(150)),
        ))
        .await
        .unwrap();

    // Reads must not extend an absolute deadline.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(store.get("Order:1").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(store.get("Order:1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sliding_expiry_resets_on_reads() {
    let store = LocalStore::new();
    store
        .set(entry(
            "Order:1",
            None,
            Expiration::sliding(Duration::from_millis(200)),
        ))
        .await
        .unwrap();

    // Keep touching the entry inside the idle window.
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.get("Order:1").await.unwrap().is_some());
    }

    // Then go idle past the window.
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(store.get("Order:1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_remove_single_key() {
    let store = LocalStore::new();
    store
        .set(entry(
            "Order:1",
            Some("Orders"),
            Expiration::absolute(Duration::from_secs(60)),
        ))
        .await
        .unwrap();

    store.remove("Order:1").await.unwrap();
    assert!(store.get("Order:1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_clear() {
    let store = LocalStore::new();
    store
        .set(entry(
            "Order:1",
            Some("Orders"),
            Expiration::absolute(Duration::from_secs(60)),
        ))
        .await
        .unwrap();

    store.clear();
    store.run_pending_tasks();
    assert!(store.is_empty());
}
