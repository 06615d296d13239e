//! Request and response types exchanged between the engine, the downloader
//! and spiders.

mod request;
mod response;

pub use request::{Method, Request};
pub use response::{Cleanup, Downloaded, Response};
