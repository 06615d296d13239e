//! Error types for the downloader module.

use thiserror::Error;

/// Errors that can occur while downloading a request.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The request URL could not be parsed.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request could not be built: a bad header, method or body.
    #[error("Invalid request to {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    /// The request did not complete within its timeout.
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// Connection, TLS, redirect or body read failure.
    #[error("Transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// A downloader middleware failed.
    #[error("Downloader middleware '{middleware}' failed for {url}: {reason}")]
    Middleware {
        middleware: String,
        url: String,
        reason: String,
    },

    /// The HTTP client could not be built from its configuration.
    #[error("Downloader configuration error: {0}")]
    Configuration(String),
}

impl DownloadError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DownloadError::Timeout(url.to_string())
        } else if err.is_builder() {
            DownloadError::InvalidRequest {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else {
            DownloadError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}
