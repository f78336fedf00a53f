use crate::core::HttpFetcher;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Remembers every body (or failure) by URL until cleared.
///
/// One update cycle reads the same pages once per wallet; with this in front of the
/// client each URL is requested once per cycle.
pub struct CachingFetcher {
    inner: Arc<dyn HttpFetcher>,
    cache: Arc<Mutex<HashMap<String, Result<String, String>>>>,
}

impl CachingFetcher {
    pub fn new(inner: Arc<dyn HttpFetcher>) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.lock().await;
        debug!(entries = cache.len(), "Clearing page cache");
        cache.clear();
    }
}

#[async_trait]
impl HttpFetcher for CachingFetcher {
    async fn fetch(&self, url: &str, headers: &[(&str, &str)]) -> Result<String> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(url) {
            debug!("Cache hit for page: {}", url);
            return match cached {
                Ok(body) => Ok(body.clone()),
                Err(e) => Err(anyhow!(e.clone())),
            };
        }
        debug!("Cache miss for page: {}", url);
        let result = self.inner.fetch(url, headers).await;
        cache.insert(
            url.to_string(),
            match &result {
                Ok(body) => Ok(body.clone()),
                Err(e) => Err(format!("{e:#}")),
            },
        );
        result
    }
}
