//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the engine's collaborator
//! traits, so whole crawls can run without network or storage.
//!
//! # Example
//!
//! ```rust,ignore
//! use crawlkit_core::testing::{MockDownloader, MockLoader, MockResponse, ScriptedSpider};
//!
//! let downloader = MockDownloader::new();
//! downloader.set_response("https://example.com", MockResponse::html("<title>x</title>")).await;
//!
//! let loader = MockLoader::new("mock");
//! let manager = ItemManager::new(vec![Box::new(loader.clone())]);
//! ```

mod mock_downloader;
mod mock_loader;
mod scripted_spider;

pub use mock_downloader::{MockDownloader, MockResponse};
pub use mock_loader::MockLoader;
pub use scripted_spider::ScriptedSpider;
