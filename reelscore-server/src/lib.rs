//! reelscore server - JSON API over the score aggregator
//!
//! Routes:
//! - `GET /api/movie/{title}`: unified score for one title
//! - `GET /api/health`: liveness check
//!
//! Every response carries permissive CORS headers.

use axum::{middleware, routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use reelscore_runtime::Aggregator;

pub mod api;

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on one score request, after which the caller gets a 500
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>, request_timeout: Duration) -> Self {
        Self {
            aggregator,
            request_timeout,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/movie/{title}", get(api::movie_scores))
        .route("/api/movie", get(api::missing_title))
        .route("/api/movie/", get(api::missing_title))
        .route("/api/health", get(api::health))
        .fallback(api::not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(api::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(api::preflight_no_content))
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn serve<F>(config: &ServerConfig, aggregator: Arc<Aggregator>, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(AppState::new(aggregator, config.request_timeout));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.addr(),
            source,
        })?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_bind_failure_names_address() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: taken.local_addr().unwrap().port(),
            ..Default::default()
        };
        let aggregator = Arc::new(Aggregator::new(Vec::new(), Default::default()));

        match serve(&config, aggregator, async {}).await {
            Err(ServerError::Bind { addr, .. }) => assert_eq!(addr, config.addr()),
            other => panic!("expected bind failure, got {:?}", other),
        }
    }
}
