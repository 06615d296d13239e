//! Closure-driven spider for testing.

use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};

use crate::http::{Request, Response};
use crate::spider::{Item, ParseError, ParseStream, Spider, Yielded};

type ScriptFn<I> = dyn Fn(&Response) -> Vec<Result<Yielded<I>, ParseError>> + Send + Sync;

/// A spider whose parse output is computed by a closure.
///
/// Records the URL of every parsed response.
///
/// # Example
///
/// ```rust,ignore
/// use crawlkit_core::testing::ScriptedSpider;
///
/// let spider = ScriptedSpider::new(vec![Request::get("https://example.com")], |response| {
///     vec![Ok(Yielded::Item(json!({ "url": response.url })))]
/// });
/// ```
pub struct ScriptedSpider<I> {
    start: Vec<Request>,
    script: Box<ScriptFn<I>>,
    parsed: Arc<Mutex<Vec<String>>>,
}

impl<I: Item> ScriptedSpider<I> {
    pub fn new<F>(start: Vec<Request>, script: F) -> Self
    where
        F: Fn(&Response) -> Vec<Result<Yielded<I>, ParseError>> + Send + Sync + 'static,
    {
        Self {
            start,
            script: Box::new(script),
            parsed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared record of parsed response URLs, usable after the spider has
    /// been moved into an engine.
    pub fn parsed_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.parsed)
    }
}

impl<I: Item> Spider for ScriptedSpider<I> {
    type Item = I;

    fn name(&self) -> &str {
        "scripted"
    }

    fn start_requests(&self) -> Vec<Request> {
        self.start.clone()
    }

    fn parse<'a>(&'a self, response: &'a Response) -> ParseStream<'a, I> {
        if let Ok(mut parsed) = self.parsed.lock() {
            parsed.push(response.url.clone());
        }
        stream::iter((self.script)(response)).boxed()
    }
}
