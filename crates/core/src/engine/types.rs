//! Types for the crawl engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::downloader::DownloadError;
use crate::items::ItemError;
use crate::spider::ParseError;

/// Errors that abort a crawl.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The downloader failed on a request.
    #[error("dispatch failed for {url}: {source}")]
    Dispatch { url: String, source: DownloadError },

    /// The spider failed while parsing a response.
    #[error("parse failed for {url}: {source}")]
    Parse { url: String, source: ParseError },

    /// The spider yielded something that is neither a request, an item nor
    /// the no-op value.
    #[error("spider yielded an unsupported value of type {type_name} while parsing {url}")]
    UnrecoverableYield {
        url: String,
        type_name: &'static str,
    },

    /// The item pipeline failed on a batch.
    #[error("item pipeline error: {0}")]
    Items(#[from] ItemError),

    /// Loaders could not be closed after an otherwise clean crawl.
    #[error("loader teardown failed: {0}")]
    Teardown(ItemError),
}

impl EngineError {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Dispatch { .. } => "dispatch",
            EngineError::Parse { .. } => "parse",
            EngineError::UnrecoverableYield { .. } => "unrecoverable_yield",
            EngineError::Items(_) => "items",
            EngineError::Teardown(_) => "teardown",
        }
    }
}

/// Totals for one finished crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    /// Loop iterations run.
    pub generations: usize,
    /// Requests handed to the downloader.
    pub requests_dispatched: usize,
    /// Responses parsed (empty downloads excluded).
    pub responses: usize,
    /// Requests yielded by the spider.
    pub requests_yielded: usize,
    /// Items yielded by the spider.
    pub items_yielded: usize,
    /// Items that passed the middleware chain.
    pub items_accepted: usize,
    /// Items vetoed by a middleware.
    pub items_ignored: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::MiddlewareError;

    #[test]
    fn test_error_display() {
        let err = EngineError::UnrecoverableYield {
            url: "https://example.com".to_string(),
            type_name: "f64",
        };
        assert_eq!(
            err.to_string(),
            "spider yielded an unsupported value of type f64 while parsing https://example.com"
        );
        assert_eq!(err.kind(), "unrecoverable_yield");
    }

    #[test]
    fn test_item_errors_convert() {
        let err: EngineError = ItemError::Middleware {
            middleware: "dedup".to_string(),
            source: MiddlewareError::failed("broken"),
        }
        .into();
        assert_eq!(err.kind(), "items");
    }

    #[test]
    fn test_summary_serialization() {
        let summary = CrawlSummary {
            generations: 2,
            items_accepted: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["generations"], 2);
        assert_eq!(json["items_accepted"], 3);
    }
}
