//! HTTP client construction and request identity
//!
//! Builds the reqwest clients the fetchers share and the browser-like
//! headers attached to every attempt.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, Proxy};
use std::time::Duration;
use thiserror::Error;

/// Fetch layer configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Maximum attempts per URL
    pub max_attempts: u32,
    /// Backoff unit; the wait before attempt i+1 is i * base_delay
    pub base_delay: Duration,
    /// Pause after each successful fetch
    pub politeness_delay: Duration,
    /// Optional outbound proxy (http://, socks5h://)
    pub proxy: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            politeness_delay: Duration::from_millis(500),
            proxy: None,
        }
    }
}

/// Errors from the fetch layer
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} timed out after {secs} seconds")]
    Timeout { url: String, secs: u64 },

    #[error("No response registered for {0}")]
    NotFound(String),

    #[error("Giving up on {url} after {attempts} attempts: {source}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

/// What the caller expects back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Json,
}

/// User agents for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:137.0) Gecko/20100101 Firefox/137.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:137.0) Gecko/20100101 Firefox/137.0",
];

/// Get a random user agent
pub fn random_user_agent() -> &'static str {
    use rand::Rng;
    let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// Headers for one attempt under the given identity
pub fn identity_headers(user_agent: &str, kind: ContentKind, url: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    match kind {
        ContentKind::Html => {
            headers.insert(
                ACCEPT,
                HeaderValue::from_static(
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
                ),
            );
            headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
        }
        ContentKind::Json => {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
            if let Some(origin) = origin_of(url) {
                if let Ok(value) = HeaderValue::from_str(origin) {
                    headers.insert(ORIGIN, value);
                }
                if let Ok(value) = HeaderValue::from_str(&format!("{}/", origin)) {
                    headers.insert(REFERER, value);
                }
            }
        }
    }

    headers
}

/// Scheme and host of a URL
fn origin_of(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")? + 3;
    let host_end = url[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i)
        .unwrap_or(url.len());
    Some(&url[..host_end])
}

/// Create the shared HTTP client
pub fn create_client(config: &FetchConfig) -> Result<Client, FetchError> {
    base_builder(config)?
        .build()
        .map_err(|e| FetchError::ClientBuild(e.to_string()))
}

/// Create a cookie-keeping client with a fixed identity, used for sessions
pub fn create_session_client(config: &FetchConfig, user_agent: &str) -> Result<Client, FetchError> {
    base_builder(config)?
        .cookie_store(true)
        .user_agent(user_agent.to_string())
        .build()
        .map_err(|e| FetchError::ClientBuild(e.to_string()))
}

fn base_builder(config: &FetchConfig) -> Result<reqwest::ClientBuilder, FetchError> {
    let mut builder = Client::builder().timeout(config.timeout);

    if let Some(proxy) = &config.proxy {
        let proxy = Proxy::all(proxy).map_err(|e| FetchError::ClientBuild(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_attempts, 3);
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_random_user_agent() {
        let ua = random_user_agent();
        assert!(ua.contains("Mozilla"));
        assert!(USER_AGENTS.contains(&ua));
    }

    #[test]
    fn test_json_identity_has_origin() {
        let headers = identity_headers(
            USER_AGENTS[0],
            ContentKind::Json,
            "https://www.metacritic.com/api/v1/search/movie/Up",
        );
        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers[ORIGIN], "https://www.metacritic.com");
        assert_eq!(headers[REFERER], "https://www.metacritic.com/");
    }

    #[test]
    fn test_html_identity() {
        let headers = identity_headers(USER_AGENTS[1], ContentKind::Html, "https://www.imdb.com/");
        assert!(headers[ACCEPT].to_str().unwrap().starts_with("text/html"));
        assert_eq!(headers[USER_AGENT], USER_AGENTS[1]);
        assert!(headers.get(ORIGIN).is_none());
    }

    #[test]
    fn test_bad_proxy_fails_to_build() {
        let config = FetchConfig {
            proxy: Some("http://[::1".to_string()),
            ..FetchConfig::default()
        };
        assert!(matches!(create_client(&config), Err(FetchError::ClientBuild(_))));
    }
}
