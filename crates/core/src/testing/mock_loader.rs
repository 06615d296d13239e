//! Mock loader for testing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::loader::{Loader, LoaderError};

/// Mock implementation of the Loader trait.
///
/// Clones share their recordings, so a test can keep one clone for
/// assertions and hand the other to a pipeline:
/// - Count opens and closes
/// - Record every dumped item as JSON
/// - Simulate open, dump and close failures
///
/// # Example
///
/// ```rust,ignore
/// use crawlkit_core::testing::MockLoader;
///
/// let loader = MockLoader::new("mock");
/// let manager = ItemManager::new(vec![Box::new(loader.clone())]);
/// manager.process_items(items).await?;
///
/// assert_eq!(loader.dump_count().await, 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockLoader {
    name: String,
    /// Number of successful opens.
    opens: Arc<RwLock<usize>>,
    /// Number of close calls that reached the loader.
    closes: Arc<RwLock<usize>>,
    /// Items stored so far.
    dumped: Arc<RwLock<Vec<Value>>>,
    /// Dumps whose JSON contains this text fail.
    fail_dumps_containing: Arc<RwLock<Option<String>>>,
    fail_on_open: Arc<RwLock<bool>>,
    fail_on_close: Arc<RwLock<bool>>,
}

impl MockLoader {
    /// Create a new mock loader.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            opens: Arc::new(RwLock::new(0)),
            closes: Arc::new(RwLock::new(0)),
            dumped: Arc::new(RwLock::new(Vec::new())),
            fail_dumps_containing: Arc::new(RwLock::new(None)),
            fail_on_open: Arc::new(RwLock::new(false)),
            fail_on_close: Arc::new(RwLock::new(false)),
        }
    }

    /// Get the number of successful opens.
    pub async fn open_count(&self) -> usize {
        *self.opens.read().await
    }

    /// Get the number of closes, failed ones included.
    pub async fn close_count(&self) -> usize {
        *self.closes.read().await
    }

    /// Get the number of items stored.
    pub async fn dump_count(&self) -> usize {
        self.dumped.read().await.len()
    }

    /// Get every stored item, in dump order.
    pub async fn dumped(&self) -> Vec<Value> {
        self.dumped.read().await.clone()
    }

    /// Make dumps fail when the item's compact JSON contains `needle`.
    pub async fn fail_dumps_containing(&self, needle: impl Into<String>) {
        *self.fail_dumps_containing.write().await = Some(needle.into());
    }

    /// Set whether open should fail.
    pub async fn set_fail_on_open(&self, fail: bool) {
        *self.fail_on_open.write().await = fail;
    }

    /// Set whether close should fail.
    pub async fn set_fail_on_close(&self, fail: bool) {
        *self.fail_on_close.write().await = fail;
    }
}

#[async_trait]
impl<I> Loader<I> for MockLoader
where
    I: Serialize + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self) -> Result<(), LoaderError> {
        if *self.fail_on_open.read().await {
            return Err(LoaderError::Io(std::io::Error::other("mock open failure")));
        }
        *self.opens.write().await += 1;
        Ok(())
    }

    async fn dump(&self, item: &I) -> Result<(), LoaderError> {
        let value = serde_json::to_value(item)?;
        if let Some(needle) = self.fail_dumps_containing.read().await.as_deref() {
            if serde_json::to_string(&value)?.contains(needle) {
                return Err(LoaderError::Serialization(format!(
                    "mock dump failure for {}",
                    value
                )));
            }
        }
        self.dumped.write().await.push(value);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), LoaderError> {
        *self.closes.write().await += 1;
        if *self.fail_on_close.read().await {
            return Err(LoaderError::Io(std::io::Error::other("mock close failure")));
        }
        Ok(())
    }
}
