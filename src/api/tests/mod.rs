use super::*;
use crate::cache::ChannelCache;
use crate::youtube::{ChannelDetail, ChannelSnippet, SearchClient, SearchItem, SearchPage};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

mod diagnostics;

/// One page of channels; `hold` parks every search so tasks stay running
#[derive(Default)]
struct StubSearchClient {
    channels: Vec<String>,
    with_emails: bool,
    hold: bool,
}

impl StubSearchClient {
    fn channels(ids: &[&str], with_emails: bool) -> Self {
        Self {
            channels: ids.iter().map(|id| id.to_string()).collect(),
            with_emails,
            hold: false,
        }
    }

    fn holding() -> Self {
        Self {
            hold: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SearchClient for StubSearchClient {
    async fn search(&self, _query: &str, _page_token: Option<&str>) -> crate::Result<SearchPage> {
        if self.hold {
            std::future::pending::<()>().await;
        }

        Ok(SearchPage {
            items: self
                .channels
                .iter()
                .map(|id| SearchItem {
                    video_id: Some(format!("vid-{id}")),
                    channel_id: Some(id.clone()),
                    author_url: None,
                })
                .collect(),
            next_page_token: None,
        })
    }

    async fn channel_details(&self, channel_ids: &[String]) -> crate::Result<Vec<ChannelDetail>> {
        Ok(channel_ids
            .iter()
            .map(|id| ChannelDetail {
                id: id.clone(),
                snippet: ChannelSnippet {
                    title: format!("Channel {id}"),
                    description: if self.with_emails {
                        format!("Sponsorships: hello@{}.tv", id.to_lowercase())
                    } else {
                        "Weekly uploads".to_string()
                    },
                    ..ChannelSnippet::default()
                },
                ..ChannelDetail::default()
            })
            .collect())
    }

    async fn resolve_video_channels(
        &self,
        _video_ids: &[String],
    ) -> crate::Result<Vec<(String, String)>> {
        Ok(Vec::new())
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.rate_limit.base_delay = Duration::ZERO;
    config
}

fn build_app(client: StubSearchClient, config: Config) -> (Router, Arc<ChannelHarvester>) {
    build_app_with_cache(client, config, ChannelCache::in_memory(Duration::from_secs(3600)))
}

fn build_app_with_cache(
    client: StubSearchClient,
    config: Config,
    cache: ChannelCache,
) -> (Router, Arc<ChannelHarvester>) {
    let harvester = Arc::new(ChannelHarvester::with_parts(
        config.clone(),
        Arc::new(client),
        cache,
    ));
    let router = create_router(harvester.clone(), Arc::new(config));
    (router, harvester)
}

/// Send one request and decode the JSON response body
async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn start(app: &Router, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, "/api/user-details/start", Some(body)).await
}

/// Poll the status route until the task leaves `running`
async fn poll_until_finished(app: &Router, task_id: &str) -> Value {
    let uri = format!("/api/user-details/status/{task_id}");
    for _ in 0..200 {
        let (status, body) = send(app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] != "running" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} still running");
}

#[tokio::test]
async fn api_server_serves_until_shutdown() {
    let mut config = test_config();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);
    let harvester = Arc::new(ChannelHarvester::with_parts(
        (*config).clone(),
        Arc::new(StubSearchClient::default()),
        ChannelCache::in_memory(Duration::from_secs(60)),
    ));

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_api_server(harvester, config, async {
        rx.await.ok();
    }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn cors_headers_present_when_enabled() {
    let mut config = test_config();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let (app, _) = build_app(StubSearchClient::default(), config);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn cors_headers_absent_when_disabled() {
    let mut config = test_config();
    config.server.api.cors_enabled = false;
    let (app, _) = build_app(StubSearchClient::default(), config);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        response
            .headers()
            .get("access-control-allow-origin")
            .is_none()
    );
}

#[tokio::test]
async fn cors_restricts_to_listed_origins() {
    let mut config = test_config();
    config.server.api.cors_origins = vec!["https://dashboard.example.com".to_string()];
    let (app, _) = build_app(StubSearchClient::default(), config);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "https://dashboard.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "https://dashboard.example.com"
    );
}
