//! Shared fixtures for router and pipeline tests
//!
//! Builds an `AppState` whose crawl and classifier clients point at wiremock
//! servers, with millisecond poll intervals and backoff.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kaypoh_common::config::{TomlConfig, TriageConfig};
use kaypoh_common::events::EventBus;
use kaypoh_rt::services::{
    CrawlClient, RemoteClassifierClient, RetryPolicy, ReviewClassifier, ScrapeOrchestrator,
};
use kaypoh_rt::{build_router, AppState};

pub const CLASSIFY_PATH: &str = "/gradio_api/call/classify_batch";
pub const ACTOR: &str = "test-actor";

/// Config pointing both remote services at mock servers
pub fn test_config(crawl: &MockServer, classifier: &MockServer) -> TriageConfig {
    let crawl_uri = crawl.uri();
    let classifier_url = format!("{}{}", classifier.uri(), CLASSIFY_PATH);
    let env = move |key: &str| match key {
        "KAYPOH_CRAWL_TOKEN" => Some("test-token".to_string()),
        "KAYPOH_CRAWL_BASE_URL" => Some(crawl_uri.clone()),
        "KAYPOH_CRAWL_ACTOR_ID" => Some(ACTOR.to_string()),
        "KAYPOH_CLASSIFIER_URL" => Some(classifier_url.clone()),
        "KAYPOH_CLASSIFIER_MAX_RETRIES" => Some("3".to_string()),
        _ => None,
    };

    let mut config = TriageConfig::from_sources(env, TomlConfig::default()).unwrap();
    config.crawl.poll_interval = Duration::from_millis(10);
    config.crawl.max_wait = Duration::from_secs(5);
    config
}

pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        rate_limit_base: Duration::from_millis(1),
        unavailable_step: Duration::from_millis(1),
        transient_base: Duration::from_millis(1),
    }
}

pub fn app_state(config: &TriageConfig, event_bus: EventBus) -> AppState {
    let crawl = CrawlClient::new(&config.crawl).unwrap();
    let classifier: Arc<dyn ReviewClassifier> = Arc::new(
        RemoteClassifierClient::new(&config.classifier)
            .unwrap()
            .with_policy(fast_policy(config.classifier.max_retries)),
    );
    let orchestrator = ScrapeOrchestrator::new(config, crawl, classifier, event_bus.clone());
    AppState::new(orchestrator, event_bus)
}

pub struct TestApp {
    pub router: Router,
    pub crawl: MockServer,
    pub classifier: MockServer,
    pub event_bus: EventBus,
}

impl TestApp {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(adjust: impl FnOnce(&mut TriageConfig)) -> Self {
        let crawl = MockServer::start().await;
        let classifier = MockServer::start().await;
        let mut config = test_config(&crawl, &classifier);
        adjust(&mut config);

        let event_bus = EventBus::new(100);
        let router = build_router(app_state(&config, event_bus.clone()), None);
        Self {
            router,
            crawl,
            classifier,
            event_bus,
        }
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    /// POST an arbitrary body labelled as JSON
    pub async fn post_raw(&self, uri: &str, body: impl Into<String>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.into()))
            .unwrap();
        send(self.router.clone(), request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(self.router.clone(), request).await
    }
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Crawl run that reports RUNNING once, then SUCCEEDED with dataset `ds-1`
pub async fn mount_successful_crawl(server: &MockServer, places: Value) {
    Mock::given(method("POST"))
        .and(path(format!("/v2/acts/{}/runs", ACTOR)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "run-1"}})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/acts/{}/runs/run-1", ACTOR)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"status": "RUNNING"}})))
        .up_to_n_times(1)
        .mount(server)
        .await;
    mount_run_status(
        server,
        json!({"data": {"status": "SUCCEEDED", "defaultDatasetId": "ds-1"}}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/v2/datasets/ds-1/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(places))
        .mount(server)
        .await;
}

/// Crawl run start plus a fixed status response
pub async fn mount_crawl_with_status(server: &MockServer, status: Value) {
    Mock::given(method("POST"))
        .and(path(format!("/v2/acts/{}/runs", ACTOR)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "run-1"}})))
        .mount(server)
        .await;
    mount_run_status(server, status).await;
}

async fn mount_run_status(server: &MockServer, status: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/acts/{}/runs/run-1", ACTOR)))
        .respond_with(ResponseTemplate::new(200).set_body_json(status))
        .mount(server)
        .await;
}

/// Classifier that labels every submitted review with `label`
///
/// Answers the job for `count` reviews; extra reviews get no result.
pub async fn mount_classifier(server: &MockServer, label: &str, count: usize) {
    Mock::given(method("POST"))
        .and(path(CLASSIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"event_id": "evt-1"})))
        .mount(server)
        .await;

    let entry = json!({
        "predictions": [{"label": label, "score": 0.75}],
        "all_scores": {label: 0.75}
    });
    let payload = json!([{"batch_results": vec![entry; count]}]);
    Mock::given(method("GET"))
        .and(path(format!("{}/evt-1", CLASSIFY_PATH)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("event: complete\ndata: {}\n\n", payload)),
        )
        .mount(server)
        .await;
}

/// Classifier that always answers 503
pub async fn mount_unavailable_classifier(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(CLASSIFY_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("Space is starting"))
        .mount(server)
        .await;
}
