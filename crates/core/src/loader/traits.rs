//! Trait definitions for the loader module.

use async_trait::async_trait;

use super::error::LoaderError;

/// A sink for accepted items.
///
/// Implementations do not track their own lifecycle; wrap them in a
/// [`StatefulLoader`](super::StatefulLoader), which enforces that `open`,
/// `dump` and `close` are called in a legal order. `dump` takes `&self`
/// because the pipeline dumps many items to the same loader concurrently.
#[async_trait]
pub trait Loader<I>: Send + Sync {
    /// Returns the name of this loader, used in logs and errors.
    fn name(&self) -> &str;

    /// Acquires the underlying resource.
    async fn open(&mut self) -> Result<(), LoaderError>;

    /// Writes one item.
    async fn dump(&self, item: &I) -> Result<(), LoaderError>;

    /// Flushes and releases the underlying resource.
    async fn close(&mut self) -> Result<(), LoaderError>;
}
