//! Generic page crawler: one record per fetched page, optional link following.

use std::collections::HashSet;
use std::sync::Mutex;

use crawlkit_core::{CrawlConfig, Item, ParseStream, Request, Response, Spider, Yielded};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Request metadata key holding the link depth from the seed.
const DEPTH_KEY: &str = "depth";

static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

static HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"'#]*)"#).unwrap());

/// What the crawler records about each page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: usize,
    pub title: Option<String>,
}

impl Item for PageRecord {
    fn table_name() -> Option<&'static str> {
        Some("pages")
    }
}

impl PageRecord {
    pub fn from_response(response: &Response) -> Self {
        Self {
            url: response.url.clone(),
            status: response.status,
            content_type: response.header("content-type").map(str::to_string),
            content_length: response.body.len(),
            title: extract_title(&response.text()),
        }
    }
}

/// Text of the first `<title>` element, whitespace collapsed.
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE.captures(html)?.get(1)?.as_str();
    let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Absolute http(s) targets of every `href` in `html`, fragments removed.
pub fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    HREF.captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .filter_map(|href| base.join(href.as_str().trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .collect()
}

/// Crawls the configured seeds.
pub struct PageSpider {
    seeds: Vec<String>,
    follow_links: bool,
    max_depth: usize,
    /// Hosts links may point to; `None` allows any host.
    allowed_hosts: Option<HashSet<String>>,
    /// Every URL ever requested.
    requested: Mutex<HashSet<String>>,
}

impl PageSpider {
    pub fn new(config: &CrawlConfig) -> Self {
        let allowed_hosts = config.same_host_only.then(|| {
            config
                .seeds
                .iter()
                .filter_map(|seed| Url::parse(seed).ok())
                .filter_map(|url| url.host_str().map(str::to_string))
                .collect()
        });

        Self {
            seeds: config.seeds.clone(),
            follow_links: config.follow_links,
            max_depth: config.max_depth,
            allowed_hosts,
            requested: Mutex::new(HashSet::new()),
        }
    }

    /// Marks `url` as requested. Returns false if it already was.
    fn claim(&self, url: &str) -> bool {
        match self.requested.lock() {
            Ok(mut requested) => requested.insert(url.to_string()),
            Err(_) => false,
        }
    }

    fn is_allowed(&self, url: &Url) -> bool {
        match (&self.allowed_hosts, url.host_str()) {
            (None, _) => true,
            (Some(hosts), Some(host)) => hosts.contains(host),
            (Some(_), None) => false,
        }
    }

    fn follow(&self, response: &Response) -> Vec<Request> {
        let depth = response
            .request
            .meta(DEPTH_KEY)
            .and_then(|d| d.as_u64())
            .unwrap_or(0) as usize;
        if !self.follow_links || depth >= self.max_depth {
            return Vec::new();
        }
        if let Some(content_type) = response.header("content-type") {
            if !content_type.contains("html") {
                return Vec::new();
            }
        }
        let base = match Url::parse(&response.url) {
            Ok(base) => base,
            Err(e) => {
                debug!("Not following links of {}: {}", response.url, e);
                return Vec::new();
            }
        };

        extract_links(&base, &response.text())
            .into_iter()
            .filter(|url| self.is_allowed(url))
            .filter(|url| self.claim(url.as_str()))
            .map(|url| {
                trace!("Following {} (depth {})", url, depth + 1);
                Request::get(url.as_str()).with_meta(DEPTH_KEY, depth + 1)
            })
            .collect()
    }
}

impl Spider for PageSpider {
    type Item = PageRecord;

    fn name(&self) -> &str {
        "pages"
    }

    fn start_requests(&self) -> Vec<Request> {
        self.seeds
            .iter()
            .filter(|seed| self.claim(seed))
            .map(|seed| Request::get(seed.as_str()).with_meta(DEPTH_KEY, 0))
            .collect()
    }

    fn parse<'a>(&'a self, response: &'a Response) -> ParseStream<'a, PageRecord> {
        let mut yielded = vec![Ok(Yielded::Item(PageRecord::from_response(response)))];
        yielded.extend(
            self.follow(response)
                .into_iter()
                .map(|request| Ok(Yielded::Request(request))),
        );
        stream::iter(yielded).boxed()
    }
}
