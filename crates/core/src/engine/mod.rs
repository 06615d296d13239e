//! Crawl engine.
//!
//! The engine drains its pending requests one generation at a time:
//! - **Dispatch**: every request of the generation goes to the downloader at once
//! - **Handling**: every response is parsed concurrently into requests and items
//! - **Items**: the collected items go through the item pipeline as one batch
//! - **Cleanup**: every response of the generation is released
//!
//! Loaders are torn down exactly once when the crawl ends, however it ends.

mod config;
mod runner;
mod types;

pub use config::EngineConfig;
pub use runner::{DownloadErrorCallback, Engine};
pub use types::{CrawlSummary, EngineError};
