//! Error types for the item pipeline.

use thiserror::Error;

use crate::loader::LoaderError;
use crate::middleware::MiddlewareError;

/// A batch-fatal item pipeline failure.
///
/// Vetoed items never show up here: they are dropped by the chain.
#[derive(Debug, Error)]
pub enum ItemError {
    /// A middleware failed with something other than a veto.
    #[error("middleware '{middleware}' failed: {source}")]
    Middleware {
        middleware: String,
        source: MiddlewareError,
    },

    /// A loader failed to open or to store an item.
    #[error("loader '{loader}' failed: {source}")]
    Loader { loader: String, source: LoaderError },
}

impl ItemError {
    pub(crate) fn loader(loader: &str, source: LoaderError) -> Self {
        ItemError::Loader {
            loader: loader.to_string(),
            source,
        }
    }
}
