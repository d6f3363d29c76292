use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::hybrid::HybridCache;
use super::local::LocalStore;
use super::mock::MemoryStore;
use super::store::{CacheEntry, CacheStore, Expiration};

fn order_entry(key: &str) -> CacheEntry {
    CacheEntry::new(
        key,
        Some("Orders".to_string()),
        json!({ "id": 7, "total": 42 }),
        Expiration::absolute(Duration::from_secs(60)),
    )
}

fn hybrid() -> (HybridCache, Arc<LocalStore>, Arc<MemoryStore>) {
    let local = Arc::new(LocalStore::new());
    let distributed = Arc::new(MemoryStore::new());
    let cache = HybridCache::new(local.clone(), distributed.clone());
    (cache, local, distributed)
}

#[tokio::test]
async fn test_set_writes_both_tiers() {
    let (cache, local, distributed) = hybrid();

    cache.set(order_entry("Order:7")).await.unwrap();

    assert!(local.contains("Order:7"));
    assert!(distributed.contains("Order:7"));
}

#[tokio::test]
async fn test_local_hit_skips_distributed_round_trip() {
    let (cache, _local, distributed) = hybrid();
    cache.set(order_entry("Order:7")).await.unwrap();

    let gets_before = distributed.get_count();
    let found = cache.get("Order:7").await.unwrap();

    assert!(found.is_some());
    assert_eq!(distributed.get_count(), gets_before);
}

#[tokio::test]
async fn test_distributed_hit_writes_through_to_local() {
    let (cache, local, distributed) = hybrid();
    distributed.set(order_entry("Order:7")).await.unwrap();
    assert!(!local.contains("Order:7"));

    let found = cache.get("Order:7").await.unwrap();
    assert!(found.is_some());
    assert!(local.contains("Order:7"));
}

#[tokio::test]
async fn test_distributed_outage_degrades_to_local_answer() {
    let (cache, _local, distributed) = hybrid();
    cache.set(order_entry("Order:7")).await.unwrap();
    distributed.set_available(false);

    // Local hit still served.
    assert!(cache.get("Order:7").await.unwrap().is_some());

    // Full miss degrades to None instead of an error.
    assert!(cache.get("Order:404").await.unwrap().is_none());

    // Writes land locally even while the shared tier is down.
    cache.set(order_entry("Order:8")).await.unwrap();
    assert!(cache.get("Order:8").await.unwrap().is_some());
}

#[tokio::test]
async fn test_tag_sweep_covers_both_tiers() {
    let (cache, local, distributed) = hybrid();
    cache.set(order_entry("Order:7")).await.unwrap();
    cache.set(order_entry("Order:8")).await.unwrap();

    cache.remove_by_tag("Orders").await.unwrap();

    assert!(!local.contains("Order:7"));
    assert!(!distributed.contains("Order:7"));
    assert!(!local.contains("Order:8"));
    assert!(!distributed.contains("Order:8"));
}

#[tokio::test]
async fn test_store_from_config_serves_local_tier() {
    use crate::config::Config;

    let config = Config {
        local_capacity: 32,
        ..Default::default()
    };
    let store = super::store_from_config(&config).unwrap();

    store.set(order_entry("Order:7")).await.unwrap();
    assert!(store.get("Order:7").await.unwrap().is_some());
}

#[tokio::test]
async fn test_store_from_config_with_unreachable_shared_tier_fails_open() {
    use crate::config::Config;

    // Nothing listens here; the hybrid must still answer from local.
    let config = Config {
        cache_url: Some("http://127.0.0.1:9".to_string()),
        http_timeout_ms: 200,
        ..Default::default()
    };
    let store = super::store_from_config(&config).unwrap();

    store.set(order_entry("Order:7")).await.unwrap();
    assert!(store.get("Order:7").await.unwrap().is_some());
    assert!(store.get("Order:404").await.unwrap().is_none());
}

#[tokio::test]
async fn test_remove_single_key_covers_both_tiers() {
    let (cache, local, distributed) = hybrid();
    cache.set(order_entry("Order:7")).await.unwrap();

    cache.remove("Order:7").await.unwrap();

    assert!(!local.contains("Order:7"));
    assert!(!distributed.contains("Order:7"));
}
