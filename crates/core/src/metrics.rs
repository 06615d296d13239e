//! Prometheus metrics for the crawl.
//!
//! This module provides metrics for:
//! - Engine (generations, dispatch, parsing)
//! - Item pipeline (accepted, ignored, dumps)
//! - Advisories (loaders never opened, missing loaders or item manager)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Engine Metrics
// =============================================================================

/// Engine loop iterations.
pub static GENERATIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("crawlkit_generations_total", "Total engine generations run").unwrap()
});

/// Requests handed to the downloader.
pub static REQUESTS_DISPATCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crawlkit_requests_dispatched_total",
        "Total requests dispatched to the downloader",
    )
    .unwrap()
});

/// Downloads by result.
pub static DOWNLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crawlkit_downloads_total", "Total downloads by result"),
        &["result"], // "response", "empty", "failed"
    )
    .unwrap()
});

/// Download duration in seconds.
pub static DOWNLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("crawlkit_download_duration_seconds", "Duration of downloads")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["result"],
    )
    .unwrap()
});

/// Values yielded by spiders, by kind.
pub static YIELDED_VALUES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crawlkit_yielded_total", "Total values yielded by spiders"),
        &["kind"], // "request", "item", "nothing"
    )
    .unwrap()
});

// =============================================================================
// Item Pipeline Metrics
// =============================================================================

/// Items that passed the middleware chain.
pub static ITEMS_ACCEPTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crawlkit_items_accepted_total",
        "Total items accepted by the middleware chain",
    )
    .unwrap()
});

/// Items vetoed, by middleware.
pub static ITEMS_IGNORED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crawlkit_items_ignored_total", "Total items ignored by middleware"),
        &["middleware"],
    )
    .unwrap()
});

/// Dumps by loader and result.
pub static DUMPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crawlkit_dumps_total", "Total item dumps by loader"),
        &["loader", "result"], // result: "success", "error"
    )
    .unwrap()
});

/// Advisory warnings: legal but unusual conditions.
pub static ADVISORIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crawlkit_advisories_total", "Total advisory warnings by kind"),
        &["kind"], // "loader_never_opened", "no_loaders", "no_item_manager"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Engine
        Box::new(GENERATIONS.clone()),
        Box::new(REQUESTS_DISPATCHED.clone()),
        Box::new(DOWNLOADS.clone()),
        Box::new(DOWNLOAD_DURATION.clone()),
        Box::new(YIELDED_VALUES.clone()),
        // Item pipeline
        Box::new(ITEMS_ACCEPTED.clone()),
        Box::new(ITEMS_IGNORED.clone()),
        Box::new(DUMPS.clone()),
        Box::new(ADVISORIES.clone()),
    ]
}
