//! Spider contract: user parsing logic plugged into the engine.
//!
//! A spider seeds the crawl with its start requests and turns every response
//! into a lazy stream of [`Yielded`] values. The engine routes requests back
//! into the next generation and items into the item pipeline.

use std::fmt::Debug;

use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

use crate::http::{Request, Response};

/// A structured record produced by a spider.
///
/// Items are compared by value only; nothing else identifies them.
pub trait Item: Serialize + Debug + Send + Sync + 'static {
    /// Table used by SQL loaders for this item type.
    fn table_name() -> Option<&'static str> {
        None
    }
}

/// Untyped items, for spiders that build records on the fly.
impl Item for serde_json::Value {}

/// One value yielded by a spider's parse stream.
#[derive(Debug)]
pub enum Yielded<I> {
    /// A new request for the next generation.
    Request(Request),
    /// A new item for the item pipeline.
    Item(I),
    /// Explicit no-op.
    Nothing,
    /// A value of a kind the engine does not understand. Yielding this
    /// aborts the crawl.
    Other { type_name: &'static str },
}

impl<I> Yielded<I> {
    /// Wraps a foreign value, keeping only its type name for diagnostics.
    pub fn other<T>(_value: T) -> Self {
        Yielded::Other {
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl<I> From<Request> for Yielded<I> {
    fn from(request: Request) -> Self {
        Yielded::Request(request)
    }
}

/// Errors raised by parsing logic.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The response did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// JSON decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other spider-specific failure.
    #[error("{0}")]
    Custom(String),
}

/// Lazy sequence of values produced while parsing one response.
pub type ParseStream<'a, I> = BoxStream<'a, Result<Yielded<I>, ParseError>>;

/// User-supplied crawling logic.
pub trait Spider: Send + Sync {
    /// The item type this spider yields.
    type Item: Item;

    /// Returns the name of this spider.
    fn name(&self) -> &str;

    /// Requests that seed the first generation.
    fn start_requests(&self) -> Vec<Request>;

    /// Parses a response into requests and items.
    ///
    /// Several responses of the same generation are parsed concurrently, so
    /// any state a spider keeps must tolerate interleaved calls.
    fn parse<'a>(&'a self, response: &'a Response) -> ParseStream<'a, Self::Item>;
}
