//! Integration tests for the reelscore HTTP API
//!
//! Tests cover:
//! - Score lookups (200 shape, 404 when no source answers)
//! - Title validation (missing or blank title)
//! - Health check
//! - CORS preflight and headers
//! - Unknown routes and the request timeout

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method

use reelscore_core::{Rating, Source};
use reelscore_runtime::{Aggregator, AggregatorConfig};
use reelscore_server::{build_router, AppState};
use reelscore_sources::{ExtractError, ScoreExtractor};

/// Test helper: extractor with a fixed answer, optionally slow
struct Fixed {
    source: Source,
    value: Option<f64>,
    delay: Duration,
}

#[async_trait]
impl ScoreExtractor for Fixed {
    fn source(&self) -> Source {
        self.source
    }

    async fn lookup(&self, _title: &str) -> Result<Option<Rating>, ExtractError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.value.and_then(|v| Rating::new(self.source, v)))
    }
}

/// Test helper: app whose three sources answer with `values`
fn setup_app(values: [Option<f64>; 3], delay: Duration, request_timeout: Duration) -> axum::Router {
    let extractors: Vec<Arc<dyn ScoreExtractor>> = Source::ALL
        .into_iter()
        .zip(values)
        .map(|(source, value)| Arc::new(Fixed { source, value, delay }) as Arc<dyn ScoreExtractor>)
        .collect();

    let aggregator = Arc::new(Aggregator::new(extractors, AggregatorConfig::default()));
    build_router(AppState::new(aggregator, request_timeout))
}

fn default_app() -> axum::Router {
    setup_app([Some(87.0), Some(74.0), Some(8.8)], Duration::ZERO, Duration::from_secs(60))
}

/// Test helper: Create request
fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Score lookups
// =============================================================================

#[tokio::test]
async fn test_movie_scores_shape() {
    let app = default_app();

    let response = app.oneshot(test_request("GET", "/api/movie/Inception")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["movieTitle"], "Inception");
    assert_eq!(body["scores"]["rottenTomatoes"], 87);
    assert_eq!(body["scores"]["metacritic"], 74);
    assert_eq!(body["scores"]["imdb"], 8.8);
    assert_eq!(body["unifiedScore"], 83);
    assert_eq!(body["validScores"], 3);
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    assert!(body.get("overridden").is_none());
}

#[tokio::test]
async fn test_encoded_title_and_missing_source() {
    let app = setup_app([Some(72.0), None, Some(8.8)], Duration::ZERO, Duration::from_secs(60));

    let response = app
        .oneshot(test_request("GET", "/api/movie/The%20Dark%20Knight"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["movieTitle"], "The Dark Knight");
    assert!(body["scores"]["metacritic"].is_null());
    assert_eq!(body["unifiedScore"], 80);
    assert_eq!(body["validScores"], 2);
}

#[tokio::test]
async fn test_no_scores_is_404() {
    let app = setup_app([None, None, None], Duration::ZERO, Duration::from_secs(60));

    let response = app.oneshot(test_request("GET", "/api/movie/Nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "No scores found for this movie. Please try a different title.");
}

// =============================================================================
// Title validation
// =============================================================================

#[tokio::test]
async fn test_missing_title_is_400() {
    for uri in ["/api/movie", "/api/movie/", "/api/movie/%20%20"] {
        let response = default_app().oneshot(test_request("GET", uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], "Movie title is required");
    }
}

// =============================================================================
// Health, CORS, routing
// =============================================================================

#[tokio::test]
async fn test_health() {
    let response = default_app().oneshot(test_request("GET", "/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_preflight_is_204() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/movie/Inception")
        .header("origin", "http://localhost:8080")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();

    let response = default_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert!(response.headers().contains_key("access-control-allow-methods"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = default_app().oneshot(test_request("GET", "/api/nothing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Endpoint not found");
}

#[tokio::test(start_paused = true)]
async fn test_request_timeout_is_500() {
    let app = setup_app(
        [Some(87.0), Some(74.0), Some(8.8)],
        Duration::from_secs(120),
        Duration::from_secs(60),
    );

    let response = app.oneshot(test_request("GET", "/api/movie/Inception")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Failed to fetch movie scores. Please try again later.");
    assert!(body["details"].as_str().unwrap().contains("timed out"));
}
