//! Downloader configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Configuration for the default HTTP downloader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Request timeout in seconds, unless the request sets its own.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Headers sent with every request. Request headers win on conflict.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,

    /// Query parameters appended to every request.
    #[serde(default)]
    pub default_query: BTreeMap<String, String>,

    /// Follow HTTP redirects.
    #[serde(default)]
    pub follow_redirects: bool,

    /// Redirect limit when `follow_redirects` is on.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Proxy URL used for all schemes.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Proxies rotated round-robin, one per request. Mutually exclusive with
    /// `proxy`.
    #[serde(default)]
    pub proxy_chain: Vec<String>,

    /// Basic auth sent with every request that has no `Authorization` header
    /// of its own.
    #[serde(default)]
    pub auth: Option<BasicAuth>,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Keep cookies between requests.
    #[serde(default = "default_cookie_store")]
    pub cookie_store: bool,
}

/// HTTP basic auth credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("crawlkit/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_redirects() -> usize {
    10
}

fn default_cookie_store() -> bool {
    true
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            default_headers: BTreeMap::new(),
            default_query: BTreeMap::new(),
            follow_redirects: false,
            max_redirects: default_max_redirects(),
            proxy: None,
            proxy_chain: Vec::new(),
            auth: None,
            accept_invalid_certs: false,
            cookie_store: default_cookie_store(),
        }
    }
}
