//! Mock downloader for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::downloader::{DownloadError, Downloader};
use crate::http::{Cleanup, Downloaded, Request, Response};

/// A canned response for one URL.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A 200 response with an HTML content type.
    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body).with_header("content-type", "text/html; charset=utf-8")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Mock implementation of the Downloader trait.
///
/// Provides controllable behavior for testing:
/// - Canned responses per URL (unknown URLs get an empty 404)
/// - Simulated transport failures and empty results
/// - Recorded requests
/// - Counters for issued and released cleanup handles
///
/// # Example
///
/// ```rust,ignore
/// use crawlkit_core::testing::{MockDownloader, MockResponse};
///
/// let downloader = MockDownloader::new();
/// downloader.set_response("https://example.com", MockResponse::html("<p>hi</p>")).await;
///
/// // ... run an engine with it ...
///
/// assert_eq!(downloader.request_count().await, 1);
/// assert_eq!(downloader.released_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDownloader {
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,
    /// URL -> failure reason.
    failures: Arc<RwLock<HashMap<String, String>>>,
    /// URLs that produce no response at all.
    empty: Arc<RwLock<HashSet<String>>>,
    requests: Arc<RwLock<Vec<Request>>>,
    delay_ms: Arc<RwLock<u64>>,
    issued: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl MockDownloader {
    /// Create a new mock downloader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response returned for `url`.
    pub async fn set_response(&self, url: impl Into<String>, response: MockResponse) {
        self.responses.write().await.insert(url.into(), response);
    }

    /// Make requests to `url` fail with a transport error.
    pub async fn set_failure(&self, url: impl Into<String>, reason: impl Into<String>) {
        self.failures.write().await.insert(url.into(), reason.into());
    }

    /// Make requests to `url` produce no response.
    pub async fn set_empty(&self, url: impl Into<String>) {
        self.empty.write().await.insert(url.into());
    }

    /// Delay every download by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay_ms.write().await = delay.as_millis() as u64;
    }

    /// Get all recorded requests, in dispatch order.
    pub async fn requests(&self) -> Vec<Request> {
        self.requests.read().await.clone()
    }

    /// Get the URLs of all recorded requests.
    pub async fn requested_urls(&self) -> Vec<String> {
        self.requests
            .read()
            .await
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    /// Get the number of recorded requests.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Number of cleanup handles handed out.
    pub fn issued_count(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    /// Number of cleanup handles released.
    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn handle(&self, request: Request) -> Result<Option<Downloaded>, DownloadError> {
        self.requests.write().await.push(request.clone());

        let delay_ms = *self.delay_ms.read().await;
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if let Some(reason) = self.failures.read().await.get(&request.url) {
            return Err(DownloadError::Transport {
                url: request.url.clone(),
                reason: reason.clone(),
            });
        }
        if self.empty.read().await.contains(&request.url) {
            return Ok(None);
        }

        let canned = self
            .responses
            .read()
            .await
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| MockResponse::new(404, Vec::new()));

        let mut response = Response::new(request, canned.status, canned.body);
        for (name, value) in canned.headers {
            response = response.with_header(name, value);
        }

        self.issued.fetch_add(1, Ordering::SeqCst);
        let released = Arc::clone(&self.released);
        let cleanup = Cleanup::new(async move {
            released.fetch_add(1, Ordering::SeqCst);
        });

        Ok(Some(Downloaded::new(response, cleanup)))
    }
}
