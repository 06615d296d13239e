//! reqwest-backed downloader.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use tracing::{debug, trace};

use super::config::DownloaderConfig;
use super::error::DownloadError;
use super::middleware::{DownloaderMiddleware, DownloaderMiddlewares};
use super::traits::Downloader;
use crate::http::{Cleanup, Downloaded, Method, Request, Response};

/// Default downloader: shared `reqwest` clients, bodies read eagerly.
///
/// HTTP error statuses are returned as responses, not failures; the spider
/// decides what a 404 means. With a proxy chain there is one client per
/// proxy and requests take them in turn.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    clients: Vec<Client>,
    next_client: Arc<AtomicUsize>,
    middlewares: DownloaderMiddlewares,
    config: DownloaderConfig,
}

impl HttpDownloader {
    /// Builds a downloader from configuration.
    pub fn new(config: DownloaderConfig) -> Result<Self, DownloadError> {
        if config.proxy.is_some() && !config.proxy_chain.is_empty() {
            return Err(DownloadError::Configuration(
                "proxy and proxy_chain cannot both be set".to_string(),
            ));
        }

        let headers = build_header_map(&config)?;
        let clients = if config.proxy_chain.is_empty() {
            vec![build_client(&config, &headers, config.proxy.as_deref())?]
        } else {
            config
                .proxy_chain
                .iter()
                .map(|proxy| build_client(&config, &headers, Some(proxy)))
                .collect::<Result<Vec<_>, _>>()?
        };
        debug!("HTTP downloader ready with {} client(s)", clients.len());

        Ok(Self {
            clients,
            next_client: Arc::new(AtomicUsize::new(0)),
            middlewares: DownloaderMiddlewares::new(),
            config,
        })
    }

    /// Appends a middleware run around every request.
    pub fn with_middleware<M>(mut self, middleware: M) -> Self
    where
        M: DownloaderMiddleware + 'static,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Returns the configuration this downloader was built with.
    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    pub fn middlewares(&self) -> &DownloaderMiddlewares {
        &self.middlewares
    }

    /// Index of the client the next request will use.
    fn next_client_index(&self) -> usize {
        self.next_client.fetch_add(1, Ordering::Relaxed) % self.clients.len()
    }

    fn to_reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }

    /// Turns a request into a `reqwest` request on `client`, applying the
    /// configured defaults underneath the request's own options.
    fn build_request(
        &self,
        client: &Client,
        request: &Request,
    ) -> Result<reqwest::Request, DownloadError> {
        let url = Url::parse(&request.url).map_err(|e| DownloadError::InvalidUrl {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;
        let headers = request_header_map(request)?;

        let mut builder = client.request(Self::to_reqwest_method(request.method), url);

        if !self.config.default_query.is_empty() {
            builder = builder.query(&self.config.default_query);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(auth) = &self.config.auth {
            if !headers.contains_key(AUTHORIZATION) {
                builder = builder.basic_auth(&auth.username, auth.password.as_ref());
            }
        }
        builder = builder.headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(timeout);
        }

        builder
            .build()
            .map_err(|e| DownloadError::from_reqwest(&request.url, e))
    }
}

fn build_client(
    config: &DownloaderConfig,
    headers: &HeaderMap,
    proxy: Option<&str>,
) -> Result<Client, DownloadError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .default_headers(headers.clone())
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .cookie_store(config.cookie_store);

    builder = if config.follow_redirects {
        builder.redirect(Policy::limited(config.max_redirects))
    } else {
        builder.redirect(Policy::none())
    };

    if let Some(proxy) = proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| DownloadError::Configuration(format!("invalid proxy: {}", e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| DownloadError::Configuration(e.to_string()))
}

fn build_header_map(config: &DownloaderConfig) -> Result<HeaderMap, DownloadError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.default_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DownloadError::Configuration(format!("header '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| DownloadError::Configuration(format!("header '{}': {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn request_header_map(request: &Request) -> Result<HeaderMap, DownloadError> {
    let invalid = |name: &str, reason: String| DownloadError::InvalidRequest {
        url: request.url.clone(),
        reason: format!("header '{}': {}", name, reason),
    };

    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| invalid(name.as_str(), e.to_string()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| invalid(name.as_str(), e.to_string()))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

#[async_trait]
impl Downloader for HttpDownloader {
    fn name(&self) -> &str {
        "http"
    }

    async fn handle(&self, mut request: Request) -> Result<Option<Downloaded>, DownloadError> {
        if !self.middlewares.process_request(&mut request).await? {
            return Ok(None);
        }

        let client = &self.clients[self.next_client_index()];
        let outbound = self.build_request(client, &request)?;
        trace!("{} {}", request.method, outbound.url());

        let response = client
            .execute(outbound)
            .await
            .map_err(|e| DownloadError::from_reqwest(&request.url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::from_reqwest(&request.url, e))?
            .to_vec();

        debug!("Downloaded {} ({} bytes, status {})", final_url, body.len(), status);

        let mut response = Response {
            request,
            url: final_url,
            status,
            headers,
            body,
        };
        if !self.middlewares.process_response(&mut response).await? {
            return Ok(None);
        }

        let released_url = response.url.clone();
        let cleanup = Cleanup::new(async move {
            trace!("Released response for {}", released_url);
        });

        Ok(Some(Downloaded::new(response, cleanup)))
    }
}
