//! Downloaded responses and their cleanup handles.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::request::Request;

/// A response produced by the downloader.
#[derive(Debug, Clone)]
pub struct Response {
    /// The request that produced this response.
    pub request: Request,
    /// Final URL after redirects.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers, lower-cased names.
    pub headers: BTreeMap<String, String>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(request: Request, status: u16, body: impl Into<Vec<u8>>) -> Self {
        let url = request.url.clone();
        Self {
            request,
            url,
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Body deserialized as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Releases the transport resources behind a response.
///
/// `release` consumes the handle, so it can run at most once. A handle that
/// is dropped without being released logs a warning.
pub struct Cleanup {
    release: Option<BoxFuture<'static, ()>>,
}

impl Cleanup {
    /// Creates a handle that runs `release` when released.
    pub fn new<F>(release: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            release: Some(release.boxed()),
        }
    }

    /// A handle with nothing to release.
    pub fn noop() -> Self {
        Self::new(async {})
    }

    /// Runs the release future.
    pub async fn release(mut self) {
        if let Some(release) = self.release.take() {
            release.await;
        }
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("pending", &self.release.is_some())
            .finish()
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        if self.release.is_some() {
            warn!("Response cleanup handle dropped without being released");
        }
    }
}

/// What a downloader hands back for one request.
#[derive(Debug)]
pub struct Downloaded {
    pub response: Response,
    pub cleanup: Cleanup,
}

impl Downloaded {
    pub fn new(response: Response, cleanup: Cleanup) -> Self {
        Self { response, cleanup }
    }
}
