//! Closure-backed middleware.

use async_trait::async_trait;

use super::traits::{ItemMiddleware, MiddlewareError};

type StageFn<I> = dyn Fn(&mut I) -> Result<(), MiddlewareError> + Send + Sync;

/// Wraps a synchronous closure as a named middleware stage.
pub struct FnMiddleware<I> {
    name: String,
    func: Box<StageFn<I>>,
}

impl<I> FnMiddleware<I> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut I) -> Result<(), MiddlewareError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl<I: Send + Sync> ItemMiddleware<I> for FnMiddleware<I> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, item: &mut I) -> Result<(), MiddlewareError> {
        (self.func)(item)
    }
}
