#![cfg(feature = "redis-tests")]

//! Channel cache tests against a real Redis server.
//!
//! Gated behind the `redis-tests` feature flag. Requires `REDIS_URL` in the
//! environment or `.env`; each test writes under its own key prefix.
//!
//! ```bash
//! docker run --rm -p 6379:6379 redis:7
//! REDIS_URL=redis://127.0.0.1:6379/0 cargo test --features redis-tests --test redis_cache
//! ```

use channel_scout::config::CacheConfig;
use channel_scout::{ChannelCache, ChannelRecord, HealthStatus};
use std::time::Duration;

/// Cache on a fresh key prefix, or `None` when no Redis is configured
fn redis_cache() -> Option<ChannelCache> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("REDIS_URL") else {
        eprintln!("REDIS_URL not set, skipping Redis test");
        return None;
    };

    Some(ChannelCache::new(&CacheConfig {
        redis_url: Some(url),
        ttl: Duration::from_secs(60),
        key_prefix: format!("channel-scout-test-{}", uuid::Uuid::new_v4()),
        connect_timeout: Duration::from_secs(2),
    }))
}

fn record(id: &str) -> ChannelRecord {
    ChannelRecord {
        channel_id: id.to_string(),
        title: format!("Channel {id}"),
        description: "Weekly bread recipes".into(),
        custom_url: None,
        subscribers: "830".into(),
        views: "12000".into(),
        videos: "17".into(),
        thumbnail: format!("https://yt3.ggpht.com/{id}.jpg"),
        emails: vec![format!("{}@example.com", id.to_lowercase())],
        keywords: None,
        country: Some("NL".into()),
    }
}

#[tokio::test]
async fn records_round_trip_through_redis() {
    let Some(cache) = redis_cache() else {
        return;
    };

    let health = cache.health_check().await;
    assert_eq!(health.status, HealthStatus::Ok, "health: {health:?}");
    assert_eq!(health.backend, "redis");

    cache.put("UCa", &record("UCa")).await;
    cache.put("UCb", &record("UCb")).await;

    let ids = ["UCa".to_string(), "UCb".to_string(), "UCmissing".to_string()];
    let found = cache.get_batch(&ids).await;
    assert_eq!(found.len(), 2);
    assert_eq!(found.get("UCa"), Some(&record("UCa")));

    let stats = cache.stats().await;
    assert!(stats.connected);
    assert_eq!(stats.known_channels, Some(2));
    // written to Redis, not to the fallback
    assert_eq!(stats.memory_entries, 0);

    cache.invalidate("UCa").await;
    assert!(cache.get("UCa").await.is_none());
    assert_eq!(cache.stats().await.known_channels, Some(1));

    cache.invalidate("UCb").await;
    cache.close().await;
}

#[tokio::test]
async fn cleanup_reconciles_index_after_expiry() {
    let Some(cache) = redis_cache() else {
        return;
    };

    cache
        .put_with_ttl("UCshort", &record("UCshort"), Duration::from_secs(1))
        .await;
    cache.put("UClong", &record("UClong")).await;
    assert_eq!(cache.stats().await.known_channels, Some(2));

    tokio::time::sleep(Duration::from_millis(2100)).await;

    // the entry is gone but its index member lingers until cleanup
    assert!(cache.get("UCshort").await.is_none());
    assert_eq!(cache.stats().await.known_channels, Some(2));

    assert_eq!(cache.cleanup_expired().await, 1);
    assert_eq!(cache.stats().await.known_channels, Some(1));
    assert!(cache.get("UClong").await.is_some());

    cache.invalidate("UClong").await;
    cache.close().await;
}

#[tokio::test]
async fn extend_ttl_keeps_entry_alive() {
    let Some(cache) = redis_cache() else {
        return;
    };

    cache
        .put_with_ttl("UCext", &record("UCext"), Duration::from_secs(1))
        .await;
    assert!(cache.extend_ttl("UCext", Duration::from_secs(30)).await);
    assert!(!cache.extend_ttl("UCnever", Duration::from_secs(30)).await);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(cache.get("UCext").await.is_some());

    cache.invalidate("UCext").await;
    cache.close().await;
}
