//! Integration tests for the HTTP endpoint
//!
//! Drives the router in-process with a scripted upstream, an in-memory store
//! and a manual clock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use nowplaying::cache::{CacheStore, MemoryCacheStore};
use nowplaying::clock::ManualClock;
use nowplaying::gate::CacheGate;
use nowplaying::server::{router, AppState};
use nowplaying::upstream::{FetchError, Payload, RecentTracksQuery, UpstreamFetcher};

enum Scripted {
    Track(&'static str),
    Malformed,
    Unavailable,
}

#[derive(Default)]
struct FakeLastfm {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Scripted>>,
}

impl FakeLastfm {
    fn then(&self, step: Scripted) -> &Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamFetcher for FakeLastfm {
    async fn fetch(&self, _query: &RecentTracksQuery) -> Result<Payload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Track(name)) => Ok(json!({ "track": name })
                .as_object()
                .cloned()
                .unwrap()),
            Some(Scripted::Malformed) => Err(FetchError::Decode("expected value".to_string())),
            Some(Scripted::Unavailable) => {
                Err(FetchError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
            }
            None => panic!("unexpected upstream call"),
        }
    }
}

struct TestApp {
    app: Router,
    upstream: Arc<FakeLastfm>,
    store: Arc<MemoryCacheStore>,
    clock: Arc<ManualClock>,
}

fn test_app() -> TestApp {
    let upstream = Arc::new(FakeLastfm::default());
    let store = Arc::new(MemoryCacheStore::new());
    let clock = Arc::new(ManualClock::at_unix(0));
    let gate = CacheGate::new(
        upstream.clone(),
        store.clone(),
        RecentTracksQuery::default(),
        Duration::seconds(30),
    )
    .with_clock(clock.clone());

    TestApp {
        app: router(AppState::new(gate)),
        upstream,
        store,
        clock,
    }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap();
    (status, content_type, body)
}

#[tokio::test]
async fn test_scenario_hit_within_window_then_refetch() {
    let t = test_app();
    t.upstream.then(Scripted::Track("A")).then(Scripted::Track("B"));

    let (status, content_type, body) = get(&t.app, "/lastfm.php").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(
        body,
        json!({ "track": "A", "cache_status": "miss", "cache_expires": 30 })
    );

    t.clock.set_unix(10);
    let (_, _, body) = get(&t.app, "/lastfm.php").await;
    assert_eq!(
        body,
        json!({ "track": "A", "cache_status": "hit", "cache_expires": 30 })
    );
    assert_eq!(t.upstream.calls(), 1);

    t.clock.set_unix(31);
    let (_, _, body) = get(&t.app, "/lastfm.php").await;
    assert_eq!(
        body,
        json!({ "track": "B", "cache_status": "miss", "cache_expires": 61 })
    );
    assert_eq!(t.upstream.calls(), 2);
}

#[tokio::test]
async fn test_many_requests_in_window_make_one_upstream_call() {
    let t = test_app();
    t.upstream.then(Scripted::Track("A"));

    for second in 0..30 {
        t.clock.set_unix(second);
        let (_, _, body) = get(&t.app, "/lastfm.php").await;
        assert_eq!(body["track"], json!("A"));
    }

    assert_eq!(t.upstream.calls(), 1);
}

#[tokio::test]
async fn test_malformed_upstream_body_returns_exact_error() {
    let t = test_app();
    t.upstream.then(Scripted::Malformed);

    let (status, _, body) = get(&t.app, "/lastfm.php").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "error": "Error decoding JSON response." }));
}

#[tokio::test]
async fn test_transport_failure_returns_distinct_error_and_keeps_cache() {
    let t = test_app();
    t.upstream.then(Scripted::Track("A")).then(Scripted::Unavailable);
    get(&t.app, "/lastfm.php").await;
    let key = RecentTracksQuery::default().cache_key();
    let before = t.store.get(&key).unwrap();

    t.clock.set_unix(60);
    let (_, _, body) = get(&t.app, "/lastfm.php").await;

    assert_eq!(
        body,
        json!({ "error": "Error occurred while making the GET request." })
    );
    assert_eq!(t.store.get(&key), Some(before));
}

#[tokio::test]
async fn test_api_alias_shares_the_cache_slot() {
    let t = test_app();
    t.upstream.then(Scripted::Track("A"));

    let (_, _, first) = get(&t.app, "/lastfm.php").await;
    let (_, _, second) = get(&t.app, "/api/v1/recent-tracks").await;

    assert_eq!(first["cache_status"], json!("miss"));
    assert_eq!(second["cache_status"], json!("hit"));
    assert_eq!(t.upstream.calls(), 1);
}

#[tokio::test]
async fn test_health_endpoint() {
    let t = test_app();

    let (status, _, body) = get(&t.app, "/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["service"], json!("nowplaying"));
    assert_eq!(t.upstream.calls(), 0);
}

#[tokio::test]
async fn test_info_lists_endpoints() {
    let t = test_app();

    let (_, _, body) = get(&t.app, "/").await;

    assert_eq!(body["cache_duration_secs"], json!(30));
    let paths: Vec<&str> = body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert!(paths.contains(&"/lastfm.php"));
}
