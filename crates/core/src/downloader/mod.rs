//! Downloader capability and the default HTTP implementation.
//!
//! The engine only sees the [`Downloader`] trait: hand it a request, get back
//! a response with its cleanup handle, nothing, or a failure. Retry policy, if
//! any, belongs to the implementation. [`HttpDownloader`] runs
//! [`DownloaderMiddleware`] hooks around each request.

mod config;
mod error;
mod http;
mod middleware;
mod traits;

pub use config::{BasicAuth, DownloaderConfig};
pub use error::DownloadError;
pub use http::HttpDownloader;
pub use middleware::{DownloaderMiddleware, DownloaderMiddlewares};
pub use traits::Downloader;
