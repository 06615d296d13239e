//! Crawl engine implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::concurrency::TaskGroup;
use crate::downloader::{DownloadError, Downloader, DownloaderConfig, HttpDownloader};
use crate::http::{Cleanup, Downloaded, Request, Response};
use crate::items::ItemManager;
use crate::metrics;
use crate::spider::{Spider, Yielded};

use super::config::EngineConfig;
use super::types::{CrawlSummary, EngineError};

/// Called for every failed download before the crawl aborts. Informational
/// only: it cannot stop the abort.
pub type DownloadErrorCallback = Arc<dyn Fn(&Request, &DownloadError) + Send + Sync>;

/// What parsing one response produced.
struct Parsed<I> {
    requests: Vec<Request>,
    items: Vec<I>,
}

/// Drives a spider until it stops producing requests.
pub struct Engine<S: Spider> {
    spider: S,
    downloader: Arc<dyn Downloader>,
    items: Option<ItemManager<S::Item>>,
    config: EngineConfig,
    on_download_error: Option<DownloadErrorCallback>,

    // Crawl state
    pending_requests: Vec<Request>,
    pending_items: Vec<S::Item>,
}

impl<S: Spider> Engine<S> {
    /// Creates an engine seeded with the spider's start requests.
    pub fn new(spider: S, downloader: Arc<dyn Downloader>) -> Self {
        let pending_requests = spider.start_requests();
        Self {
            spider,
            downloader,
            items: None,
            config: EngineConfig::default(),
            on_download_error: None,
            pending_requests,
            pending_items: Vec::new(),
        }
    }

    /// Creates an engine using an [`HttpDownloader`] with default settings.
    pub fn with_default_downloader(spider: S) -> Result<Self, DownloadError> {
        let downloader = HttpDownloader::new(DownloaderConfig::default())?;
        Ok(Self::new(spider, Arc::new(downloader)))
    }

    /// Sends accepted items through `manager`. Without one, items are dropped.
    pub fn with_item_manager(mut self, manager: ItemManager<S::Item>) -> Self {
        self.items = Some(manager);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Pause between generations.
    pub fn with_loop_delay(mut self, delay: Duration) -> Self {
        self.config.loop_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn on_download_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Request, &DownloadError) + Send + Sync + 'static,
    {
        self.on_download_error = Some(Arc::new(callback));
        self
    }

    /// Adds a request to the first generation.
    pub fn enqueue(&mut self, request: Request) {
        self.pending_requests.push(request);
    }

    /// Requests waiting for the next generation.
    pub fn pending_requests(&self) -> &[Request] {
        &self.pending_requests
    }

    pub fn item_manager(&self) -> Option<&ItemManager<S::Item>> {
        self.items.as_ref()
    }

    /// Runs the crawl to completion.
    ///
    /// Loaders are torn down once at the end whether the crawl succeeded or
    /// not. A fatal error is returned after teardown; a teardown failure after
    /// a clean crawl is returned as [`EngineError::Teardown`]. Dropping the
    /// returned future before it completes skips the teardown.
    pub async fn run(mut self) -> Result<CrawlSummary, EngineError> {
        info!(
            "Starting crawl with spider '{}' ({} start requests, downloader '{}')",
            self.spider.name(),
            self.pending_requests.len(),
            self.downloader.name()
        );
        if self.items.is_none() {
            warn!("No item manager configured; yielded items will be discarded");
            metrics::ADVISORIES
                .with_label_values(&["no_item_manager"])
                .inc();
        }

        let result = self.crawl().await;

        let teardown = match &self.items {
            Some(manager) => manager.tear_down_loaders().await,
            None => Ok(()),
        };

        match (result, teardown) {
            (Ok(summary), Ok(())) => {
                info!(
                    "Crawl finished: {} generations, {} requests, {} items accepted, {} ignored",
                    summary.generations,
                    summary.requests_dispatched,
                    summary.items_accepted,
                    summary.items_ignored
                );
                Ok(summary)
            }
            (Ok(_), Err(e)) => {
                let err = EngineError::Teardown(e);
                error!("Crawl failed ({}): {}", err.kind(), err);
                Err(err)
            }
            (Err(err), teardown) => {
                if let Err(e) = teardown {
                    warn!("Loader teardown also failed: {}", e);
                }
                error!("Crawl aborted ({}): {}", err.kind(), err);
                Err(err)
            }
        }
    }

    async fn crawl(&mut self) -> Result<CrawlSummary, EngineError> {
        let mut summary = CrawlSummary::default();

        while !self.pending_requests.is_empty() {
            summary.generations += 1;
            metrics::GENERATIONS.inc();

            let generation = std::mem::take(&mut self.pending_requests);
            debug!(
                "Generation {}: dispatching {} requests",
                summary.generations,
                generation.len()
            );
            summary.requests_dispatched += generation.len();

            let (responses, cleanups): (Vec<Response>, Vec<Cleanup>) = self
                .dispatch(generation)
                .await?
                .into_iter()
                .map(|d| (d.response, d.cleanup))
                .unzip();
            summary.responses += responses.len();

            let handled = self.handle_responses(&responses, &mut summary).await;
            release_all(cleanups).await;
            handled?;

            let delay = self.config.loop_delay();
            if !delay.is_zero() && !self.pending_requests.is_empty() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(summary)
    }

    /// Downloads every request of a generation concurrently.
    ///
    /// On failure the responses that already arrived are released before the
    /// error is returned.
    async fn dispatch(&self, generation: Vec<Request>) -> Result<Vec<Downloaded>, EngineError> {
        let mut group = TaskGroup::new();
        for request in generation {
            group.push(self.download(request));
        }

        let joined = group.join().await;
        match joined.failure {
            None => Ok(joined.completed.into_iter().flatten().collect()),
            Some(err) => {
                if joined.cancelled > 0 {
                    debug!("Cancelled {} in-flight downloads", joined.cancelled);
                }
                release_all(
                    joined
                        .completed
                        .into_iter()
                        .flatten()
                        .map(|d| d.cleanup)
                        .collect(),
                )
                .await;
                Err(err)
            }
        }
    }

    async fn download(&self, request: Request) -> Result<Option<Downloaded>, EngineError> {
        metrics::REQUESTS_DISPATCHED.inc();
        let url = request.url.clone();
        let retained = self.on_download_error.as_ref().map(|_| request.clone());
        let started = Instant::now();

        let result = self.downloader.handle(request).await;
        let outcome = match &result {
            Ok(Some(_)) => "response",
            Ok(None) => "empty",
            Err(_) => "failed",
        };
        metrics::DOWNLOADS.with_label_values(&[outcome]).inc();
        metrics::DOWNLOAD_DURATION
            .with_label_values(&[outcome])
            .observe(started.elapsed().as_secs_f64());

        result.map_err(|source| {
            warn!("Download of {} failed: {}", url, source);
            if let (Some(callback), Some(request)) = (&self.on_download_error, &retained) {
                callback(request, &source);
            }
            EngineError::Dispatch { url, source }
        })
    }

    /// Parses every response concurrently, then feeds the results back into
    /// the pending collections and runs the item batch.
    async fn handle_responses(
        &mut self,
        responses: &[Response],
        summary: &mut CrawlSummary,
    ) -> Result<(), EngineError> {
        let mut group = TaskGroup::new();
        for response in responses {
            group.push(parse_response(&self.spider, response));
        }
        let parsed = group.join().await.into_result()?;

        for Parsed { requests, items } in parsed {
            summary.requests_yielded += requests.len();
            summary.items_yielded += items.len();
            self.pending_requests.extend(requests);
            self.pending_items.extend(items);
        }

        let items = std::mem::take(&mut self.pending_items);
        if items.is_empty() {
            return Ok(());
        }

        match &self.items {
            Some(manager) => {
                let report = manager.process_items(items).await?;
                summary.items_accepted += report.accepted;
                summary.items_ignored += report.ignored;
            }
            None => debug!("Discarding {} items", items.len()),
        }
        Ok(())
    }
}

/// Consumes one response's parse stream.
async fn parse_response<S: Spider>(
    spider: &S,
    response: &Response,
) -> Result<Parsed<S::Item>, EngineError> {
    let mut parsed = Parsed {
        requests: Vec::new(),
        items: Vec::new(),
    };

    let mut stream = spider.parse(response);
    while let Some(next) = stream.next().await {
        let yielded = next.map_err(|source| EngineError::Parse {
            url: response.url.clone(),
            source,
        })?;

        match yielded {
            Yielded::Request(request) => {
                metrics::YIELDED_VALUES.with_label_values(&["request"]).inc();
                parsed.requests.push(request);
            }
            Yielded::Item(item) => {
                metrics::YIELDED_VALUES.with_label_values(&["item"]).inc();
                parsed.items.push(item);
            }
            Yielded::Nothing => {
                metrics::YIELDED_VALUES.with_label_values(&["nothing"]).inc();
            }
            Yielded::Other { type_name } => {
                return Err(EngineError::UnrecoverableYield {
                    url: response.url.clone(),
                    type_name,
                });
            }
        }
    }

    Ok(parsed)
}

async fn release_all(cleanups: Vec<Cleanup>) {
    futures::future::join_all(cleanups.into_iter().map(Cleanup::release)).await;
}
