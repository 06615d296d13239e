//! Item pipeline manager.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::ItemError;
use crate::concurrency::TaskGroup;
use crate::loader::{CloseOutcome, Loader, StatefulLoader};
use crate::metrics;
use crate::middleware::{ChainOutcome, ItemMiddleware, MiddlewareChain};
use crate::spider::Item;

/// Called once for every item that passed the whole chain.
pub type AcceptedCallback<I> = Arc<dyn Fn(&I) + Send + Sync>;

/// Called once for every vetoed item, with the name of the vetoing middleware.
pub type IgnoredCallback<I> = Arc<dyn Fn(&I, &str) + Send + Sync>;

/// What one call to [`ItemManager::process_items`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items handed to the manager.
    pub received: usize,
    /// Items that passed the middleware chain.
    pub accepted: usize,
    /// Items vetoed by a middleware.
    pub ignored: usize,
    /// Successful loader dumps (accepted items times loaders, minus failures).
    pub dumped: usize,
}

/// Drives batches of items through the middleware chain and into every loader.
pub struct ItemManager<I: Item> {
    chain: MiddlewareChain<I>,
    loaders: Vec<StatefulLoader<I>>,
    on_item_accepted: Option<AcceptedCallback<I>>,
    on_item_ignored: Option<IgnoredCallback<I>>,
}

impl<I: Item> ItemManager<I> {
    /// Creates a manager writing to `loaders`, with an empty chain.
    ///
    /// Every loader is wrapped in its lifecycle state machine. With no loaders
    /// at all, accepted items are discarded.
    pub fn new(loaders: Vec<Box<dyn Loader<I>>>) -> Self {
        if loaders.is_empty() {
            warn!("Item manager has no loaders; accepted items will be discarded");
            metrics::ADVISORIES.with_label_values(&["no_loaders"]).inc();
        }

        Self {
            chain: MiddlewareChain::new(),
            loaders: loaders.into_iter().map(StatefulLoader::from_boxed).collect(),
            on_item_accepted: None,
            on_item_ignored: None,
        }
    }

    /// Appends a middleware to the chain.
    pub fn with_middleware<M>(mut self, middleware: M) -> Self
    where
        M: ItemMiddleware<I> + 'static,
    {
        self.chain.push(Box::new(middleware));
        self
    }

    /// Replaces the whole chain.
    pub fn with_chain(mut self, chain: MiddlewareChain<I>) -> Self {
        self.chain = chain;
        self
    }

    pub fn on_item_accepted<F>(mut self, callback: F) -> Self
    where
        F: Fn(&I) + Send + Sync + 'static,
    {
        self.on_item_accepted = Some(Arc::new(callback));
        self
    }

    pub fn on_item_ignored<F>(mut self, callback: F) -> Self
    where
        F: Fn(&I, &str) + Send + Sync + 'static,
    {
        self.on_item_ignored = Some(Arc::new(callback));
        self
    }

    /// The wrapped loaders, in configuration order.
    pub fn loaders(&self) -> &[StatefulLoader<I>] {
        &self.loaders
    }

    pub fn chain(&self) -> &MiddlewareChain<I> {
        &self.chain
    }

    /// Runs one item through the chain and fires the matching callback.
    ///
    /// Returns `None` for a vetoed item.
    pub async fn run_chain(&self, item: I) -> Result<Option<I>, ItemError> {
        match self.chain.run(item).await? {
            ChainOutcome::Accepted(item) => {
                metrics::ITEMS_ACCEPTED.inc();
                if let Some(callback) = &self.on_item_accepted {
                    callback(&item);
                }
                Ok(Some(item))
            }
            ChainOutcome::Ignored {
                item, middleware, ..
            } => {
                metrics::ITEMS_IGNORED
                    .with_label_values(&[middleware.as_str()])
                    .inc();
                if let Some(callback) = &self.on_item_ignored {
                    callback(&item, &middleware);
                }
                Ok(None)
            }
        }
    }

    /// Processes one batch.
    ///
    /// All chains run concurrently; a fatal middleware error cancels the rest
    /// and is returned before anything is dumped. Every accepted item is then
    /// dumped to every loader concurrently. Dump failures do not stop the
    /// other dumps: the first one is returned once all of them have settled.
    pub async fn process_items(&self, items: Vec<I>) -> Result<BatchReport, ItemError> {
        let received = items.len();
        if received == 0 {
            return Ok(BatchReport::default());
        }

        let mut chains = TaskGroup::new();
        for item in items {
            chains.push(self.run_chain(item));
        }
        let accepted: Vec<I> = chains
            .join()
            .await
            .into_result()?
            .into_iter()
            .flatten()
            .collect();

        let mut report = BatchReport {
            received,
            accepted: accepted.len(),
            ignored: received - accepted.len(),
            dumped: 0,
        };
        debug!(
            "Item batch: {} received, {} accepted, {} ignored",
            report.received, report.accepted, report.ignored
        );

        if accepted.is_empty() || self.loaders.is_empty() {
            return Ok(report);
        }

        // Opens are never cancelled: a half-opened sink would be left behind
        // with its wrapper still in `Created`.
        let mut opens = TaskGroup::new();
        for loader in &self.loaders {
            opens.push(async move {
                loader
                    .ensure_open()
                    .await
                    .map_err(|e| ItemError::loader(loader.name(), e))
            });
        }
        let mut first_error = None;
        for result in opens.join_settled().await {
            if let Err(e) = result {
                warn!("Open failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let mut dumps = TaskGroup::new();
        for loader in &self.loaders {
            for item in &accepted {
                dumps.push(async move {
                    let result = loader.dump(item).await;
                    let outcome = if result.is_ok() { "success" } else { "error" };
                    metrics::DUMPS
                        .with_label_values(&[loader.name(), outcome])
                        .inc();
                    result.map_err(|e| ItemError::loader(loader.name(), e))
                });
            }
        }

        let mut first_error = None;
        for result in dumps.join_settled().await {
            match result {
                Ok(()) => report.dumped += 1,
                Err(e) => {
                    warn!("Dump failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Closes every loader, including those that never received an item.
    ///
    /// Keeps going past failures and returns the first one.
    pub async fn tear_down_loaders(&self) -> Result<(), ItemError> {
        let mut first_error = None;
        let mut closed = 0;

        for loader in &self.loaders {
            match loader.close().await {
                Ok(CloseOutcome::Closed) => closed += 1,
                Ok(CloseOutcome::NeverOpened) => {}
                Err(e) => {
                    warn!("Failed to close loader '{}': {}", loader.name(), e);
                    first_error.get_or_insert(ItemError::loader(loader.name(), e));
                }
            }
        }

        info!(
            "Tore down {} loaders ({} had been opened)",
            self.loaders.len(),
            closed
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<I: Item> fmt::Debug for ItemManager<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemManager")
            .field("middlewares", &self.chain.names())
            .field("loaders", &self.loaders)
            .finish_non_exhaustive()
    }
}
