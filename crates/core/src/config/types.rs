use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::downloader::DownloaderConfig;
use crate::engine::EngineConfig;
use crate::loader::OutputConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// What to crawl
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Start URLs.
    #[serde(default)]
    pub seeds: Vec<String>,
    /// Request the links found on fetched pages.
    #[serde(default)]
    pub follow_links: bool,
    /// Link depth from a seed (seeds are depth 0).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Only follow links to the seeds' hosts.
    #[serde(default = "default_true")]
    pub same_host_only: bool,
    /// Drop items equal to one already seen.
    #[serde(default = "default_true")]
    pub dedup_items: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            follow_links: false,
            max_depth: default_max_depth(),
            same_host_only: true,
            dedup_items: true,
        }
    }
}

fn default_max_depth() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Metrics output
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// File receiving the Prometheus text exposition when the crawl ends.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Sanitized config for logging (proxy credentials and header values hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub engine: EngineConfig,
    pub downloader: SanitizedDownloaderConfig,
    pub output: OutputConfig,
    pub crawl: CrawlConfig,
    pub metrics: MetricsConfig,
}

/// Sanitized downloader config
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDownloaderConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub default_header_names: Vec<String>,
    pub default_query: Vec<String>,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub proxy_configured: bool,
    pub proxy_chain_len: usize,
    pub auth_username: Option<String>,
    pub accept_invalid_certs: bool,
    pub cookie_store: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let d = &config.downloader;
        Self {
            engine: config.engine.clone(),
            downloader: SanitizedDownloaderConfig {
                timeout_secs: d.timeout_secs,
                user_agent: d.user_agent.clone(),
                default_header_names: d.default_headers.keys().cloned().collect(),
                default_query: d.default_query.keys().cloned().collect(),
                follow_redirects: d.follow_redirects,
                max_redirects: d.max_redirects,
                proxy_configured: d.proxy.is_some(),
                proxy_chain_len: d.proxy_chain.len(),
                auth_username: d.auth.as_ref().map(|a| a.username.clone()),
                accept_invalid_certs: d.accept_invalid_certs,
                cookie_store: d.cookie_store,
            },
            output: config.output.clone(),
            crawl: config.crawl.clone(),
            metrics: config.metrics.clone(),
        }
    }
}
