//! Router-level tests for the narration API
//!
//! The orchestrator runs against in-process fakes; requests go through
//! `tower::ServiceExt::oneshot` without binding a socket.

mod helpers;

use axum::body::Body;
use axum::http::StatusCode;
use fablecast_np::api::{create_router, AppState};
use helpers::{FakeClassifier, FakeMusic, FakeSpeech, FakeStore, Utterance};
use http::{header, Method, Request};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;

fn test_router(speech: Arc<FakeSpeech>) -> axum::Router {
    let orchestrator = helpers::orchestrator(
        Arc::new(FakeClassifier::ok()),
        speech,
        Arc::new(FakeMusic::track(0.2, 0.5)),
        Arc::new(FakeStore::durable()),
        2,
    );
    create_router(AppState {
        orchestrator: Arc::new(orchestrator),
        port: 5760,
    })
}

async fn make_request(
    app: axum::Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    use tower::ServiceExt;

    let request = match body {
        Some(json_body) => Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let app = test_router(Arc::new(FakeSpeech::new()));
    let (status, body) = make_request(app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "fablecast-np");
}

#[tokio::test]
async fn test_missing_required_fields_return_400() {
    let app = test_router(Arc::new(FakeSpeech::new()));
    let (status, body) = make_request(
        app.clone(),
        Method::POST,
        "/api/v1/narration",
        Some(json!({ "text": "Once upon a time." })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = make_request(
        app,
        Method::POST,
        "/api/v1/narration",
        Some(json!({ "bookId": "bk-1", "text": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_narration_happy_path() {
    let app = test_router(Arc::new(FakeSpeech::new()));
    let (status, body) = make_request(
        app,
        Method::POST,
        "/api/v1/narration",
        Some(json!({
            "text": "Once upon a time.\n\nThe end.",
            "bookId": "bk-1",
            "options": { "backgroundMusicVolume": 0.3 }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("https://cdn.example.com/audio-narrations/books/bk-1/full/"));
}

#[tokio::test]
async fn test_paragraph_returns_url_and_metadata() {
    let app = test_router(Arc::new(FakeSpeech::new()));
    let (status, body) = make_request(
        app,
        Method::POST,
        "/api/v1/narration/paragraph",
        Some(json!({
            "text": "A storm rolled in over the bay.",
            "bookId": "bk-1",
            "paragraphIndex": 4
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    assert!(url.contains("/books/bk-1/paragraphs/4_"));
    // Index 4 is even, so the fake classifier reports "tense".
    assert_eq!(body["metadata"]["mood"], "tense");
    assert_eq!(body["metadata"]["genre"], "adventure");
    assert_eq!(body["metadata"]["intensity"], 5);
}

#[tokio::test]
async fn test_episode_returns_paragraph_urls_and_episodes() {
    let app = test_router(Arc::new(FakeSpeech::new()));
    let (status, body) = make_request(
        app,
        Method::POST,
        "/api/v1/narration/episode",
        Some(json!({
            "text": "a\n\nb\n\nc",
            "bookId": "bk-1",
            "chapterId": "ch-2",
            "options": { "episodeBreaks": [2] }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paragraphUrls"].as_array().unwrap().len(), 3);
    let episodes = body["episodes"].as_array().unwrap();
    assert_eq!(episodes.len(), 2);
    assert!(episodes[0]["url"]
        .as_str()
        .unwrap()
        .contains("/books/bk-1/chapters/ch-2/episodes/1_"));
}

#[tokio::test]
async fn test_pipeline_failure_maps_to_500_with_typed_code() {
    let speech = Arc::new(FakeSpeech::new());
    speech.set(
        "doomed paragraph",
        Utterance {
            fail: true,
            ..Utterance::default()
        },
    );
    let app = test_router(speech);

    let (status, body) = make_request(
        app,
        Method::POST,
        "/api/v1/narration",
        Some(json!({ "text": "doomed paragraph", "bookId": "bk-1" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "SYNTHESIS_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().len() > 0);
}

#[tokio::test]
async fn test_unknown_fade_curve_rejected() {
    let app = test_router(Arc::new(FakeSpeech::new()));
    let (status, body) = make_request(
        app,
        Method::POST,
        "/api/v1/narration",
        Some(json!({
            "text": "hello",
            "bookId": "bk-1",
            "options": { "fadeCurve": "triangle" }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
