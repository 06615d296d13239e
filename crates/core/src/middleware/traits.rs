//! Trait definitions for the middleware module.

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a middleware stage.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    /// Drop this item. Not a failure.
    #[error("Item ignored: {0}")]
    Ignore(String),

    /// The stage itself is broken. Fatal to the batch.
    #[error("Middleware failed: {0}")]
    Failed(String),
}

impl MiddlewareError {
    pub fn ignore(reason: impl Into<String>) -> Self {
        MiddlewareError::Ignore(reason.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        MiddlewareError::Failed(reason.into())
    }

    /// Whether this error only drops the current item.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, MiddlewareError::Ignore(_))
    }
}

/// One stage of the item pipeline.
#[async_trait]
pub trait ItemMiddleware<I>: Send + Sync {
    /// Returns the name of this middleware, used in logs and callbacks.
    fn name(&self) -> &str;

    /// Processes one item, possibly rewriting it.
    async fn process(&self, item: &mut I) -> Result<(), MiddlewareError>;
}
