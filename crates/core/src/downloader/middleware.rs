//! Downloader middleware: hooks around every request and response.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::error::DownloadError;
use crate::http::{Request, Response};
use crate::middleware::MiddlewareError;

/// A hook run by the downloader before sending a request and after
/// receiving its response.
///
/// Either hook may rewrite its argument in place or veto it with
/// [`MiddlewareError::Ignore`], which makes the downloader return nothing for
/// that request. Any other error fails the download.
#[async_trait]
pub trait DownloaderMiddleware: Send + Sync {
    /// Returns the name of this middleware, used in logs and errors.
    fn name(&self) -> &str;

    async fn process_request(&self, _request: &mut Request) -> Result<(), MiddlewareError> {
        Ok(())
    }

    async fn process_response(&self, _response: &mut Response) -> Result<(), MiddlewareError> {
        Ok(())
    }
}

/// Downloader middlewares in configuration order.
///
/// Requests go through them first to last, responses last to first.
#[derive(Clone, Default)]
pub struct DownloaderMiddlewares {
    stages: Vec<Arc<dyn DownloaderMiddleware>>,
}

impl DownloaderMiddlewares {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn DownloaderMiddleware>) {
        self.stages.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Runs the request hooks. Returns `false` if a middleware vetoed it.
    pub async fn process_request(&self, request: &mut Request) -> Result<bool, DownloadError> {
        for stage in &self.stages {
            match stage.process_request(request).await {
                Ok(()) => {}
                Err(MiddlewareError::Ignore(reason)) => {
                    debug!(
                        "Request to {} dropped by '{}': {}",
                        request.url,
                        stage.name(),
                        reason
                    );
                    return Ok(false);
                }
                Err(MiddlewareError::Failed(reason)) => {
                    return Err(DownloadError::Middleware {
                        middleware: stage.name().to_string(),
                        url: request.url.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(true)
    }

    /// Runs the response hooks in reverse order. Returns `false` if a
    /// middleware vetoed the response.
    pub async fn process_response(&self, response: &mut Response) -> Result<bool, DownloadError> {
        for stage in self.stages.iter().rev() {
            match stage.process_response(response).await {
                Ok(()) => {}
                Err(MiddlewareError::Ignore(reason)) => {
                    debug!(
                        "Response from {} dropped by '{}': {}",
                        response.url,
                        stage.name(),
                        reason
                    );
                    return Ok(false);
                }
                Err(MiddlewareError::Failed(reason)) => {
                    return Err(DownloadError::Middleware {
                        middleware: stage.name().to_string(),
                        url: response.url.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(true)
    }
}

impl fmt::Debug for DownloaderMiddlewares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the order hooks ran in and can veto or fail.
    struct Recorder {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        veto_requests: bool,
        fail_responses: bool,
    }

    impl Recorder {
        fn new(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                log: Arc::clone(log),
                veto_requests: false,
                fail_responses: false,
            }
        }
    }

    #[async_trait]
    impl DownloaderMiddleware for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn process_request(&self, request: &mut Request) -> Result<(), MiddlewareError> {
            self.log.lock().unwrap().push(format!("req:{}", self.name));
            if self.veto_requests {
                return Err(MiddlewareError::ignore("blocked"));
            }
            request.headers.insert(format!("x-{}", self.name), "1".to_string());
            Ok(())
        }

        async fn process_response(&self, response: &mut Response) -> Result<(), MiddlewareError> {
            self.log.lock().unwrap().push(format!("resp:{}", self.name));
            if self.fail_responses {
                return Err(MiddlewareError::failed("bad response"));
            }
            response.body.extend_from_slice(self.name.as_bytes());
            Ok(())
        }
    }

    fn chain(stages: Vec<Recorder>) -> DownloaderMiddlewares {
        let mut chain = DownloaderMiddlewares::new();
        for stage in stages {
            chain.push(Arc::new(stage));
        }
        chain
    }

    #[tokio::test]
    async fn test_requests_forward_responses_backward() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain(vec![Recorder::new("a", &log), Recorder::new("b", &log)]);
        assert_eq!(chain.names(), vec!["a", "b"]);

        let mut request = Request::get("https://example.com");
        assert!(chain.process_request(&mut request).await.unwrap());
        assert!(request.headers.contains_key("x-a"));
        assert!(request.headers.contains_key("x-b"));

        let mut response = Response::new(request, 200, "");
        assert!(chain.process_response(&mut response).await.unwrap());
        assert_eq!(response.body, b"ba");

        assert_eq!(
            *log.lock().unwrap(),
            vec!["req:a", "req:b", "resp:b", "resp:a"]
        );
    }

    #[tokio::test]
    async fn test_request_veto_stops_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut blocker = Recorder::new("blocker", &log);
        blocker.veto_requests = true;
        let chain = chain(vec![blocker, Recorder::new("after", &log)]);

        let mut request = Request::get("https://example.com");
        assert!(!chain.process_request(&mut request).await.unwrap());
        assert_eq!(*log.lock().unwrap(), vec!["req:blocker"]);
    }

    #[tokio::test]
    async fn test_response_failure_names_the_middleware() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut broken = Recorder::new("broken", &log);
        broken.fail_responses = true;
        let chain = chain(vec![broken]);

        let mut response = Response::new(Request::get("https://example.com/x"), 200, "");
        let err = chain.process_response(&mut response).await.unwrap_err();

        assert!(matches!(
            err,
            DownloadError::Middleware { ref middleware, ref url, .. }
                if middleware == "broken" && url == "https://example.com/x"
        ));
    }
}
