//! Item middleware: ordered processing stages between spiders and loaders.
//!
//! Each stage may let an item pass, rewrite it in place, or veto it with
//! [`MiddlewareError::Ignore`]. A veto drops only that item; any other error
//! is fatal to the whole batch.

mod chain;
mod dedup;
mod func;
mod traits;

pub use chain::{ChainOutcome, MiddlewareChain};
pub use dedup::DedupMiddleware;
pub use func::FnMiddleware;
pub use traits::{ItemMiddleware, MiddlewareError};
