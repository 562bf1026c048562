//! HTTP handlers
//!
//! All responses are JSON. Failures use `{ "error": ... }`, with `details`
//! on internal faults.

use axum::{
    extract::{Path, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::any::Any;
use tracing::error;

use reelscore_core::AggregateResult;
use reelscore_runtime::AggregateError;

use crate::AppState;

const MISSING_TITLE: &str = "Movie title is required";
const NO_SCORES: &str = "No scores found for this movie. Please try a different title.";
const FETCH_FAILED: &str = "Failed to fetch movie scores. Please try again later.";

/// API errors
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal { details: Option<String> },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::Internal { details: Some(details) } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": FETCH_FAILED, "details": details }),
            ),
            ApiError::Internal { details: None } => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": FETCH_FAILED }))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<AggregateError> for ApiError {
    fn from(e: AggregateError) -> Self {
        match e {
            AggregateError::InvalidTitle => ApiError::BadRequest(MISSING_TITLE.to_string()),
            AggregateError::Empty { .. } => ApiError::NotFound(NO_SCORES.to_string()),
        }
    }
}

/// GET /api/movie/{title}
pub async fn movie_scores(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<AggregateResult>, ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest(MISSING_TITLE.to_string()));
    }

    match tokio::time::timeout(state.request_timeout, state.aggregator.score(&title)).await {
        Ok(result) => Ok(Json(result?)),
        Err(_) => {
            error!(
                "Scoring {:?} exceeded the {}s request timeout",
                title,
                state.request_timeout.as_secs()
            );
            Err(ApiError::Internal {
                details: Some(format!(
                    "Request timed out after {}s",
                    state.request_timeout.as_secs()
                )),
            })
        }
    }
}

/// GET /api/movie and /api/movie/
pub async fn missing_title() -> ApiError {
    ApiError::BadRequest(MISSING_TITLE.to_string())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now(),
    })
}

/// Any unrouted path
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Endpoint not found".to_string())
}

/// Answer CORS preflight with 204 No Content
pub async fn preflight_no_content(request: Request, next: Next) -> Response {
    let is_preflight = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;

    if is_preflight && response.status().is_success() {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// Response for a handler panic; the payload is logged, never returned
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", message);

    ApiError::Internal { details: None }.into_response()
}
