//! Ordered middleware chain.

use tracing::{debug, trace};

use super::traits::{ItemMiddleware, MiddlewareError};
use crate::items::ItemError;

/// What happened to an item that went through the chain.
#[derive(Debug)]
pub enum ChainOutcome<I> {
    /// Every stage let the item pass.
    Accepted(I),
    /// A stage vetoed the item.
    Ignored {
        item: I,
        middleware: String,
        reason: String,
    },
}

/// Middlewares applied strictly in the order they were added.
pub struct MiddlewareChain<I> {
    stages: Vec<Box<dyn ItemMiddleware<I>>>,
}

impl<I> Default for MiddlewareChain<I> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<I: Send + Sync> MiddlewareChain<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage and returns the chain.
    pub fn with<M>(mut self, middleware: M) -> Self
    where
        M: ItemMiddleware<I> + 'static,
    {
        self.stages.push(Box::new(middleware));
        self
    }

    /// Appends an already boxed stage.
    pub fn push(&mut self, middleware: Box<dyn ItemMiddleware<I>>) {
        self.stages.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Runs one item through every stage.
    ///
    /// The first veto stops the chain and returns the item as ignored. Any
    /// other stage error is returned as [`ItemError::Middleware`].
    pub async fn run(&self, mut item: I) -> Result<ChainOutcome<I>, ItemError> {
        for stage in &self.stages {
            trace!("Running item through middleware '{}'", stage.name());
            match stage.process(&mut item).await {
                Ok(()) => {}
                Err(MiddlewareError::Ignore(reason)) => {
                    debug!("Middleware '{}' ignored item: {}", stage.name(), reason);
                    return Ok(ChainOutcome::Ignored {
                        item,
                        middleware: stage.name().to_string(),
                        reason,
                    });
                }
                Err(source) => {
                    return Err(ItemError::Middleware {
                        middleware: stage.name().to_string(),
                        source,
                    });
                }
            }
        }
        Ok(ChainOutcome::Accepted(item))
    }
}
