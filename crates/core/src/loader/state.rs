//! Loader lifecycle state machine.
//!
//! ```text
//! Created ──open──▶ Opened ──dump──▶ Dumping ─┐
//!    │                 │                ▲     │ dump
//!    │                 │                └─────┘
//!    └──────close──────┴──────close──────────────▶ Closed
//! ```
//!
//! `Closed` is terminal. Every rejected transition leaves the state as it was.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use super::error::{InvalidStateError, LoaderError};
use super::traits::Loader;
use crate::metrics;

/// Lifecycle state of a wrapped loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderState {
    Created,
    Opened,
    Dumping,
    Closed,
}

impl LoaderState {
    /// Whether `dump` is legal in this state.
    pub fn accepts_dumps(&self) -> bool {
        matches!(self, LoaderState::Opened | LoaderState::Dumping)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderState::Created => "created",
            LoaderState::Opened => "opened",
            LoaderState::Dumping => "dumping",
            LoaderState::Closed => "closed",
        }
    }
}

impl fmt::Display for LoaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The loader was open and has been closed.
    Closed,
    /// The loader was never opened; nothing was released. An advisory
    /// warning has been logged.
    NeverOpened,
}

struct Slot<I> {
    state: LoaderState,
    loader: Box<dyn Loader<I>>,
}

/// A loader wrapped in its lifecycle state machine.
///
/// Dumps share a read lock, so they run concurrently with each other. Open
/// and close take the write lock: they wait for in-flight dumps, and no dump
/// can reach the sink once close has started.
pub struct StatefulLoader<I> {
    name: String,
    slot: RwLock<Slot<I>>,
}

impl<I: Send + Sync> StatefulLoader<I> {
    pub fn new<L>(loader: L) -> Self
    where
        L: Loader<I> + 'static,
    {
        Self::from_boxed(Box::new(loader))
    }

    pub fn from_boxed(loader: Box<dyn Loader<I>>) -> Self {
        Self {
            name: loader.name().to_string(),
            slot: RwLock::new(Slot {
                state: LoaderState::Created,
                loader,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub async fn state(&self) -> LoaderState {
        self.slot.read().await.state
    }

    /// Opens the loader. Legal only from `Created`.
    pub async fn open(&self) -> Result<(), LoaderError> {
        let mut slot = self.slot.write().await;
        match slot.state {
            LoaderState::Created => self.open_slot(&mut slot).await,
            LoaderState::Opened => Err(InvalidStateError::AlreadyOpened.into()),
            LoaderState::Dumping => Err(InvalidStateError::AlreadyDumping.into()),
            LoaderState::Closed => Err(InvalidStateError::ReopenAfterClose.into()),
        }
    }

    /// Opens the loader unless it is already open.
    ///
    /// Returns `true` if this call opened it. Fails only for a closed loader
    /// or when the underlying open fails.
    pub async fn ensure_open(&self) -> Result<bool, LoaderError> {
        let mut slot = self.slot.write().await;
        match slot.state {
            LoaderState::Created => self.open_slot(&mut slot).await.map(|()| true),
            LoaderState::Opened | LoaderState::Dumping => Ok(false),
            LoaderState::Closed => Err(InvalidStateError::ReopenAfterClose.into()),
        }
    }

    async fn open_slot(&self, slot: &mut Slot<I>) -> Result<(), LoaderError> {
        slot.loader.open().await?;
        slot.state = LoaderState::Opened;
        debug!("Loader '{}' opened", self.name);
        Ok(())
    }

    /// Writes one item. Legal from `Opened` and `Dumping`; the first
    /// successful dump moves `Opened` to `Dumping`.
    pub async fn dump(&self, item: &I) -> Result<(), LoaderError> {
        let promote = {
            let slot = self.slot.read().await;
            match slot.state {
                LoaderState::Created => return Err(InvalidStateError::DumpBeforeOpen.into()),
                LoaderState::Closed => return Err(InvalidStateError::DumpAfterClose.into()),
                LoaderState::Opened | LoaderState::Dumping => {}
            }
            slot.loader.dump(item).await?;
            slot.state == LoaderState::Opened
        };

        if promote {
            let mut slot = self.slot.write().await;
            // A close may have slipped in between the two locks.
            if slot.state == LoaderState::Opened {
                slot.state = LoaderState::Dumping;
                trace!("Loader '{}' is dumping", self.name);
            }
        }
        Ok(())
    }

    /// Closes the loader.
    ///
    /// Closing a loader that was never opened is legal: it logs an advisory,
    /// skips the underlying close and reports [`CloseOutcome::NeverOpened`].
    /// From `Opened` or `Dumping` the state becomes `Closed` even if the
    /// underlying close fails.
    pub async fn close(&self) -> Result<CloseOutcome, LoaderError> {
        let mut slot = self.slot.write().await;
        match slot.state {
            LoaderState::Closed => Err(InvalidStateError::AlreadyClosed.into()),
            LoaderState::Created => {
                warn!(
                    "Loader '{}' is being closed but was never opened; nothing was written",
                    self.name
                );
                metrics::ADVISORIES
                    .with_label_values(&["loader_never_opened"])
                    .inc();
                slot.state = LoaderState::Closed;
                Ok(CloseOutcome::NeverOpened)
            }
            LoaderState::Opened | LoaderState::Dumping => {
                let result = slot.loader.close().await;
                slot.state = LoaderState::Closed;
                debug!("Loader '{}' closed", self.name);
                result.map(|()| CloseOutcome::Closed)
            }
        }
    }
}

impl<I> fmt::Debug for StatefulLoader<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatefulLoader")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLoader;

    fn wrapped() -> (StatefulLoader<serde_json::Value>, MockLoader) {
        let mock = MockLoader::new("mock");
        (StatefulLoader::new(mock.clone()), mock)
    }

    fn item(n: i64) -> serde_json::Value {
        serde_json::json!({ "n": n })
    }

    #[tokio::test]
    async fn test_starts_created() {
        let (loader, _) = wrapped();
        assert_eq!(loader.state().await, LoaderState::Created);
        assert_eq!(loader.name(), "mock");
    }

    #[tokio::test]
    async fn test_open_then_open_again_fails() {
        let (loader, mock) = wrapped();
        loader.open().await.unwrap();
        assert_eq!(loader.state().await, LoaderState::Opened);

        let err = loader.open().await.unwrap_err();
        assert!(matches!(
            err,
            LoaderError::InvalidState(InvalidStateError::AlreadyOpened)
        ));
        assert_eq!(mock.open_count().await, 1);
    }

    #[tokio::test]
    async fn test_open_while_dumping_fails() {
        let (loader, _) = wrapped();
        loader.open().await.unwrap();
        loader.dump(&item(1)).await.unwrap();

        let err = loader.open().await.unwrap_err();
        assert!(matches!(
            err,
            LoaderError::InvalidState(InvalidStateError::AlreadyDumping)
        ));
    }

    #[tokio::test]
    async fn test_reopen_after_close_fails() {
        let (loader, _) = wrapped();
        loader.open().await.unwrap();
        loader.close().await.unwrap();

        let err = loader.open().await.unwrap_err();
        assert!(matches!(
            err,
            LoaderError::InvalidState(InvalidStateError::ReopenAfterClose)
        ));
        assert_eq!(loader.state().await, LoaderState::Closed);
    }

    #[tokio::test]
    async fn test_dump_before_open_fails_and_keeps_state() {
        let (loader, mock) = wrapped();
        let err = loader.dump(&item(1)).await.unwrap_err();

        assert!(matches!(
            err,
            LoaderError::InvalidState(InvalidStateError::DumpBeforeOpen)
        ));
        assert_eq!(loader.state().await, LoaderState::Created);
        assert_eq!(mock.dump_count().await, 0);
    }

    #[tokio::test]
    async fn test_dump_after_close_fails_and_keeps_state() {
        let (loader, mock) = wrapped();
        loader.open().await.unwrap();
        loader.close().await.unwrap();

        let err = loader.dump(&item(1)).await.unwrap_err();
        assert!(matches!(
            err,
            LoaderError::InvalidState(InvalidStateError::DumpAfterClose)
        ));
        assert_eq!(loader.state().await, LoaderState::Closed);
        assert_eq!(mock.dump_count().await, 0);
    }

    #[tokio::test]
    async fn test_first_dump_moves_to_dumping_and_stays() {
        let (loader, mock) = wrapped();
        loader.open().await.unwrap();

        loader.dump(&item(1)).await.unwrap();
        assert_eq!(loader.state().await, LoaderState::Dumping);

        loader.dump(&item(2)).await.unwrap();
        assert_eq!(loader.state().await, LoaderState::Dumping);
        assert_eq!(mock.dumped().await, vec![item(1), item(2)]);
    }

    #[tokio::test]
    async fn test_failed_dump_does_not_promote() {
        let (loader, mock) = wrapped();
        mock.fail_dumps_containing("\"n\":13").await;
        loader.open().await.unwrap();

        assert!(loader.dump(&item(13)).await.is_err());
        assert_eq!(loader.state().await, LoaderState::Opened);
    }

    #[tokio::test]
    async fn test_close_unopened_is_advisory() {
        let (loader, mock) = wrapped();
        let outcome = loader.close().await.unwrap();

        assert_eq!(outcome, CloseOutcome::NeverOpened);
        assert_eq!(loader.state().await, LoaderState::Closed);
        assert_eq!(mock.close_count().await, 0);
    }

    #[tokio::test]
    async fn test_close_twice_fails() {
        let (loader, mock) = wrapped();
        loader.open().await.unwrap();
        assert_eq!(loader.close().await.unwrap(), CloseOutcome::Closed);

        let err = loader.close().await.unwrap_err();
        assert!(matches!(
            err,
            LoaderError::InvalidState(InvalidStateError::AlreadyClosed)
        ));
        assert_eq!(loader.state().await, LoaderState::Closed);
        assert_eq!(mock.close_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_close_still_closes() {
        let (loader, mock) = wrapped();
        mock.set_fail_on_close(true).await;
        loader.open().await.unwrap();

        assert!(loader.close().await.is_err());
        assert_eq!(loader.state().await, LoaderState::Closed);
    }

    #[tokio::test]
    async fn test_failed_open_stays_created() {
        let (loader, mock) = wrapped();
        mock.set_fail_on_open(true).await;

        assert!(loader.open().await.is_err());
        assert_eq!(loader.state().await, LoaderState::Created);
    }

    #[tokio::test]
    async fn test_ensure_open_is_idempotent() {
        let (loader, mock) = wrapped();
        assert!(loader.ensure_open().await.unwrap());
        assert!(!loader.ensure_open().await.unwrap());
        loader.dump(&item(1)).await.unwrap();
        assert!(!loader.ensure_open().await.unwrap());
        assert_eq!(mock.open_count().await, 1);

        loader.close().await.unwrap();
        assert!(loader.ensure_open().await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_dumps() {
        let (loader, mock) = wrapped();
        loader.open().await.unwrap();

        let items: Vec<_> = (0..20).map(item).collect();
        let results = futures::future::join_all(items.iter().map(|i| loader.dump(i))).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(mock.dump_count().await, 20);
        assert_eq!(loader.state().await, LoaderState::Dumping);
    }
}
