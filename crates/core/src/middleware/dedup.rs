//! Value-equality de-duplication.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::traits::{ItemMiddleware, MiddlewareError};
use crate::spider::Item;

/// Ignores items equal to one already seen during this crawl.
///
/// Items are fingerprinted with SHA-256 over their JSON form. Object keys are
/// sorted before hashing, so map-typed fields compare by content.
#[derive(Debug, Default)]
pub struct DedupMiddleware {
    seen: Mutex<HashSet<String>>,
}

impl DedupMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct items seen so far.
    pub fn seen_count(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }

    fn fingerprint<I: Item>(item: &I) -> Result<String, MiddlewareError> {
        let value = serde_json::to_value(item)
            .map_err(|e| MiddlewareError::failed(format!("cannot fingerprint item: {}", e)))?;
        let bytes = serde_json::to_vec(&value)
            .map_err(|e| MiddlewareError::failed(format!("cannot fingerprint item: {}", e)))?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}

#[async_trait]
impl<I: Item> ItemMiddleware<I> for DedupMiddleware {
    fn name(&self) -> &str {
        "dedup"
    }

    async fn process(&self, item: &mut I) -> Result<(), MiddlewareError> {
        let fingerprint = Self::fingerprint(item)?;
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| MiddlewareError::failed("fingerprint set poisoned"))?;

        if seen.insert(fingerprint) {
            Ok(())
        } else {
            Err(MiddlewareError::ignore("duplicate item"))
        }
    }
}
