//! Integration tests for the cache contract against a real Redis.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use cache::Cache;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use test_utils::TestRedis;

async fn connection_manager(redis: &TestRedis) -> ConnectionManager {
    let client = redis::Client::open(redis.connection_string()).expect("client");
    ConnectionManager::new(client).await.expect("manager")
}

#[tokio::test]
async fn test_get_or_set_calls_loader_once_within_ttl() {
    let redis = TestRedis::new().await;
    let cache = Cache::new(connection_manager(&redis).await);

    let calls = Arc::new(AtomicU32::new(0));

    for _ in 0..2 {
        let calls = calls.clone();
        let value: String = cache
            .get_or_set("products:list:page=1", 60, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::convert::Infallible>("page-one".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "page-one");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_or_set_reloads_after_ttl_expiry() {
    let redis = TestRedis::new().await;
    let cache = Cache::new(connection_manager(&redis).await);

    let calls = Arc::new(AtomicU32::new(0));

    let load = |calls: Arc<AtomicU32>| {
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>(41u32)
        }
    };

    let _: u32 = cache
        .get_or_set("orders:stats:today", 1, load(calls.clone()))
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    let _: u32 = cache
        .get_or_set("orders:stats:today", 1, load(calls.clone()))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_corrupt_entry_falls_back_to_loader() {
    let redis = TestRedis::new().await;
    let manager = connection_manager(&redis).await;
    let cache = Cache::new(manager.clone());

    // Seed something that does not deserialize as u32
    let mut conn = manager.clone();
    conn.set::<_, _, ()>("orders:o1", "not-json{{").await.unwrap();

    let value: u32 = cache
        .get_or_set("orders:o1", 60, || async { Ok::<_, std::convert::Infallible>(7u32) })
        .await
        .unwrap();

    assert_eq!(value, 7);
}

#[tokio::test]
async fn test_delete_pattern_scoped_to_prefix() {
    let redis = TestRedis::new().await;
    let manager = connection_manager(&redis).await;
    let cache = Cache::new(manager.clone());

    let mut conn = manager.clone();
    conn.set::<_, _, ()>("activity_logs:list:page=1", "a").await.unwrap();
    conn.set::<_, _, ()>("activity_logs:list:page=2", "b").await.unwrap();
    conn.set::<_, _, ()>("activity_logs:stats:week", "c").await.unwrap();
    conn.set::<_, _, ()>("products:list:page=1", "d").await.unwrap();

    let deleted = cache.delete_pattern("activity_logs:list:*").await.unwrap();
    assert_eq!(deleted, 2);

    let survivor: bool = conn.exists("activity_logs:stats:week").await.unwrap();
    assert!(survivor);
    let untouched: bool = conn.exists("products:list:page=1").await.unwrap();
    assert!(untouched);
}

#[tokio::test]
async fn test_invalidate_lists_for_removes_lists_and_stats() {
    let redis = TestRedis::new().await;
    let manager = connection_manager(&redis).await;
    let cache = Cache::new(manager.clone());

    let mut conn = manager.clone();
    conn.set::<_, _, ()>("activity_logs:list:page=1", "a").await.unwrap();
    conn.set::<_, _, ()>("activity_logs:stats:week", "b").await.unwrap();
    conn.set::<_, _, ()>("activity_logs:0199aa", "detail").await.unwrap();

    let deleted = cache.invalidate_lists_for("activity_logs").await.unwrap();
    assert_eq!(deleted, 2);

    // Detail entries are invalidated individually, not by the list sweep
    let detail: bool = conn.exists("activity_logs:0199aa").await.unwrap();
    assert!(detail);

    cache.invalidate("activity_logs", "0199aa").await.unwrap();
    let detail: bool = conn.exists("activity_logs:0199aa").await.unwrap();
    assert!(!detail);
}
