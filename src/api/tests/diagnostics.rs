use super::*;
use crate::config::CacheConfig;

#[tokio::test]
async fn stats_report_tasks_rate_limit_and_cache() {
    let (app, _) = build_app(StubSearchClient::channels(&["UCa"], false), test_config());

    let (_, body) = start(&app, json!({"query": "cooking", "filterMode": "2", "targetCount": 1})).await;
    poll_until_finished(&app, body["taskId"].as_str().unwrap()).await;

    let (status, stats) = send(&app, Method::GET, "/api/user-details/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["tasks"]["total"], 1);
    assert_eq!(stats["tasks"]["completed"], 1);
    assert_eq!(stats["maxActiveTasks"], 10);
    assert_eq!(stats["rateLimit"]["requestsPerMinute"], 100);
    assert_eq!(stats["rateLimit"]["requestsThisMinute"], 2);
    assert_eq!(stats["cache"]["backend"], "memory");
    assert_eq!(stats["cache"]["memoryEntries"], 1);
}

#[tokio::test]
async fn quota_reports_usage_without_warning() {
    let (app, _) = build_app(StubSearchClient::default(), test_config());

    let (status, body) = send(&app, Method::GET, "/api/user-details/quota", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["usage"]["requestsToday"], 0);
    assert_eq!(body["usage"]["requestsPerDay"], 10_000);
    assert!(body.get("warning").is_none());
}

#[tokio::test]
async fn quota_warns_near_daily_budget() {
    let mut config = test_config();
    config.rate_limit.requests_per_day = 10;
    let (app, harvester) = build_app(StubSearchClient::default(), config);

    for _ in 0..9 {
        harvester.governor().record_request(true).await;
    }

    let (_, body) = send(&app, Method::GET, "/api/user-details/quota", None).await;
    assert_eq!(body["usage"]["requestsToday"], 9);
    assert!(body["warning"].as_str().unwrap().contains("90%"));
}

#[tokio::test]
async fn cache_health_ok_for_memory_backend() {
    let (app, _) = build_app(StubSearchClient::default(), test_config());

    let (status, body) = send(&app, Method::GET, "/api/user-details/cache/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn cache_health_degraded_when_redis_unreachable() {
    let cache = ChannelCache::new(&CacheConfig {
        redis_url: Some("redis://127.0.0.1:1/0".to_string()),
        connect_timeout: Duration::from_millis(500),
        ..CacheConfig::default()
    });
    let (app, _) = build_app_with_cache(StubSearchClient::default(), test_config(), cache);

    let (status, body) = send(&app, Method::GET, "/api/user-details/cache/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn cache_cleanup_reports_removed_count() {
    let (app, harvester) = build_app(StubSearchClient::default(), test_config());

    let record = ChannelDetail {
        id: "UCold".into(),
        ..ChannelDetail::default()
    }
    .into_record();
    harvester
        .cache()
        .put_with_ttl("UCold", &record, Duration::from_millis(1))
        .await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (status, body) = send(&app, Method::POST, "/api/user-details/cache/cleanup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);

    let (_, again) = send(&app, Method::POST, "/api/user-details/cache/cleanup", None).await;
    assert_eq!(again["removed"], 0);
}
