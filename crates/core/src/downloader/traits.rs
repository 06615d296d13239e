//! Trait definitions for the downloader module.

use async_trait::async_trait;

use super::error::DownloadError;
use crate::http::{Downloaded, Request};

/// Turns requests into responses.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the name of this downloader implementation.
    fn name(&self) -> &str;

    /// Downloads a single request.
    ///
    /// `Ok(None)` means the request produced nothing worth parsing; the
    /// engine drops it silently.
    async fn handle(&self, request: Request) -> Result<Option<Downloaded>, DownloadError>;
}
