//! Canned-response fetcher
//!
//! Serves registered bodies by exact URL and records every request, so
//! extraction can be exercised against fixture markup instead of live sites.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::{ContentKind, FetchError, PageFetcher};

#[derive(Debug, Clone)]
enum Reply {
    Body(String),
    Status(u16),
}

/// In-memory [`PageFetcher`]
#[derive(Debug, Default)]
pub struct FixtureFetcher {
    replies: HashMap<String, Reply>,
    requests: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.replies.insert(url.to_string(), Reply::Body(body.to_string()));
        self
    }

    /// Answer `url` with an error status
    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.replies.insert(url.to_string(), Reply::Status(status));
        self
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch(&self, url: &str, _kind: ContentKind) -> Result<String, FetchError> {
        self.requests.lock().push(url.to_string());

        match self.replies.get(url) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FetchError::NotFound(url.to_string())),
        }
    }
}
