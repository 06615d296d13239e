pub mod concurrency;
pub mod config;
pub mod downloader;
pub mod engine;
pub mod http;
pub mod items;
pub mod loader;
pub mod metrics;
pub mod middleware;
pub mod spider;
pub mod testing;

pub use concurrency::{Joined, TaskGroup};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, CrawlConfig,
    MetricsConfig, SanitizedConfig,
};
pub use downloader::{
    BasicAuth, DownloadError, Downloader, DownloaderConfig, DownloaderMiddleware,
    DownloaderMiddlewares, HttpDownloader,
};
pub use engine::{CrawlSummary, Engine, EngineConfig, EngineError};
pub use http::{Cleanup, Downloaded, Method, Request, Response};
pub use items::{BatchReport, ItemError, ItemManager};
pub use loader::{
    create_loaders, CloseOutcome, CsvLoader, InvalidStateError, JsonLoader, Loader, LoaderError,
    LoaderState, OutputConfig, SqliteLoader, StatefulLoader,
};
pub use middleware::{
    ChainOutcome, DedupMiddleware, FnMiddleware, ItemMiddleware, MiddlewareChain, MiddlewareError,
};
pub use spider::{Item, ParseError, ParseStream, Spider, Yielded};
