//! Router tests: health, single review classification, request validation

mod helpers;

use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use helpers::{mount_classifier, mount_unavailable_classifier, TestApp, CLASSIFY_PATH};

#[tokio::test]
async fn health_reports_module_and_version() {
    let app = TestApp::start().await;

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "kaypoh-rt");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = TestApp::start().await;
    let (status, _) = app.get("/no-such-page").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn classify_rejects_blank_text_before_any_network_call() {
    let app = TestApp::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.classifier)
        .await;

    let (status, body) = app
        .post_json("/api/classify-review", json!({"reviewText": "   ", "rating": 4}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(body["error"]["message"], "Review text is required");
}

#[tokio::test]
async fn classify_rejects_out_of_range_rating() {
    let app = TestApp::start().await;

    for rating in [0.0, 5.5, -1.0] {
        let (status, _) = app
            .post_json(
                "/api/classify-review",
                json!({"reviewText": "Lovely noodles", "rating": rating}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "rating {}", rating);
    }

    let (status, body) = app
        .post_json("/api/classify-review", json!({"reviewText": "Lovely noodles"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Rating is required");
}

#[tokio::test]
async fn classify_rejects_threshold_out_of_range() {
    let app = TestApp::start().await;
    let (status, _) = app
        .post_json(
            "/api/classify-review",
            json!({"reviewText": "Lovely noodles", "rating": 4, "threshold": 2.0}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn classify_uses_local_rules_first() {
    let app = TestApp::start().await;
    Mock::given(method("POST"))
        .and(path(CLASSIFY_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.classifier)
        .await;

    let (status, body) = app
        .post_json(
            "/api/classify-review",
            json!({"reviewText": "Visit our website for deals! www.fake.com", "rating": 1}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "local");
    assert_eq!(body["predictions"][0]["label"], "Advertisements");
    assert_eq!(body["predictions"][0]["score"], 0.9);
    assert_eq!(body["scores"]["Advertisements"], 0.9);
    assert!(body["reason"]
        .as_str()
        .unwrap()
        .starts_with("Advertisements: URLs detected"));
}

#[tokio::test]
async fn classify_sends_undecided_review_to_model() {
    let app = TestApp::start().await;
    mount_classifier(&app.classifier, "Useful Review", 1).await;

    let (status, body) = app
        .post_json(
            "/api/classify-review",
            json!({
                "reviewText": "Interesting place, went there on Tuesday",
                "rating": 4,
                "hasPhoto": true,
                "threshold": 0.4
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "model");
    assert_eq!(body["predictions"][0]["label"], "Useful");
    assert_eq!(body["predictions"][0]["score"], 0.75);
    assert_eq!(body["reason"], "Model prediction: Useful: 75.0%");
}

#[tokio::test]
async fn classify_reports_exhausted_model_as_bad_gateway() {
    let app = TestApp::start().await;
    mount_unavailable_classifier(&app.classifier).await;

    let (status, body) = app
        .post_json(
            "/api/classify-review",
            json!({"reviewText": "Interesting place, went there on Tuesday", "rating": 3}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("after 3 attempts"));

    let requests = app.classifier.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn search_requires_query() {
    let app = TestApp::start().await;

    for body in [json!({}), json!({"searchQuery": "  "})] {
        let (status, response) = app.post_json("/api/scrape-reviews", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["message"], "Search query is required");
    }

    assert!(app.crawl.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_bodies_get_error_envelope() {
    let app = TestApp::start().await;

    let (status, body) = app.post_raw("/api/classify-review", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].is_string());

    let (status, body) = app
        .post_json(
            "/api/classify-review",
            json!({"reviewText": "Lovely noodles", "rating": "five"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = app
        .post_json("/api/scrape-reviews", json!({"searchQuery": "laksa", "scope": "moon"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    assert!(app.classifier.received_requests().await.unwrap().is_empty());
    assert!(app.crawl.received_requests().await.unwrap().is_empty());
}
