//! Page fetchers
//!
//! Extractors only see the [`PageFetcher`] capability. Two network-backed
//! implementations exist:
//! - [`HttpFetcher`]: pooled client, fresh identity on every attempt
//! - [`SessionFetcher`]: one long-lived cookie-keeping session with a stable
//!   identity, acquired on first use and released by [`PageFetcher::close`]

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use tracing::{debug, info};

use crate::{
    create_client, create_session_client, identity_headers, random_user_agent, with_retry,
    ContentKind, FetchConfig, FetchError, RetryPolicy,
};

/// Capability to fetch a page body
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a URL, retrying per the fetcher's policy
    async fn fetch(&self, url: &str, kind: ContentKind) -> Result<String, FetchError>;

    /// Release long-lived resources. Safe to call more than once.
    async fn close(&self) {}
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            timeout: self.timeout,
            base_delay: self.base_delay,
        }
    }
}

/// One GET under the given identity; non-2xx is an error
async fn get_once(
    client: &Client,
    url: &str,
    kind: ContentKind,
    user_agent: Option<&str>,
) -> Result<String, FetchError> {
    let mut request = client.get(url);
    if let Some(user_agent) = user_agent {
        request = request.headers(identity_headers(user_agent, kind, url));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.text().await?)
}

async fn politeness_pause(config: &FetchConfig) {
    if !config.politeness_delay.is_zero() {
        tokio::time::sleep(config.politeness_delay).await;
    }
}

/// Plain HTTP fetcher with per-attempt identity rotation
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = create_client(&config)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, kind: ContentKind) -> Result<String, FetchError> {
        debug!("Fetching: {}", url);

        let body = with_retry(url, self.config.retry_policy(), |_| {
            let user_agent = random_user_agent();
            get_once(&self.client, url, kind, Some(user_agent))
        })
        .await?;

        politeness_pause(&self.config).await;
        Ok(body)
    }
}

/// Long-lived browsing session shared by all queries.
///
/// The session is created lazily on the first fetch, reused by concurrent
/// requests, and dropped by `close()`. A fetch after `close()` opens a new
/// session.
pub struct SessionFetcher {
    config: FetchConfig,
    session: Mutex<Option<Session>>,
}

#[derive(Clone)]
struct Session {
    client: Client,
    user_agent: &'static str,
}

impl SessionFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    /// Whether a session is currently held
    pub fn is_open(&self) -> bool {
        self.session.lock().is_some()
    }

    fn acquire(&self) -> Result<Session, FetchError> {
        let mut guard = self.session.lock();
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let user_agent = random_user_agent();
        let session = Session {
            client: create_session_client(&self.config, user_agent)?,
            user_agent,
        };
        info!("Opened fetch session");
        *guard = Some(session.clone());
        Ok(session)
    }
}

#[async_trait]
impl PageFetcher for SessionFetcher {
    async fn fetch(&self, url: &str, kind: ContentKind) -> Result<String, FetchError> {
        let session = self.acquire()?;
        debug!("Fetching in session: {}", url);

        let body = with_retry(url, self.config.retry_policy(), |_| {
            get_once(&session.client, url, kind, Some(session.user_agent))
        })
        .await?;

        politeness_pause(&self.config).await;
        Ok(body)
    }

    async fn close(&self) {
        if self.session.lock().take().is_some() {
            info!("Closed fetch session");
        }
    }
}
