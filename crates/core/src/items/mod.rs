//! Item pipeline: middleware chain in front of every configured loader.

mod error;
mod manager;

pub use error::ItemError;
pub use manager::{AcceptedCallback, BatchReport, IgnoredCallback, ItemManager};
