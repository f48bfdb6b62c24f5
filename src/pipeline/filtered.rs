use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entities::UrlRef;
use crate::pipeline::adapters::{Fetcher, Generator};
use crate::urls::{FilterChain, SourceError};

/// Runs a [`FilterChain`] over everything a fetcher returns. A filter error
/// fails the whole fetch.
#[derive(Clone)]
pub struct Filtered {
    inner: Arc<dyn Fetcher>,
    filters: FilterChain,
}

impl Filtered {
    pub fn new(inner: impl Fetcher + 'static, filters: FilterChain) -> Self {
        Self {
            inner: Arc::new(inner),
            filters,
        }
    }
}

#[async_trait]
impl Fetcher for Filtered {
    async fn fetch(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<UrlRef>, SourceError> {
        let found = self.inner.fetch(cancel, url).await?;
        let total = found.len();
        let kept = self.filters.apply(cancel, found).await?;
        debug!(url, total, kept = kept.len(), filters = ?self.filters, "urls filtered");
        Ok(kept)
    }
}

/// [`Filtered`] for generators.
#[derive(Clone)]
pub struct FilteredGenerator {
    inner: Arc<dyn Generator>,
    filters: FilterChain,
}

impl FilteredGenerator {
    pub fn new(inner: impl Generator + 'static, filters: FilterChain) -> Self {
        Self {
            inner: Arc::new(inner),
            filters,
        }
    }
}

#[async_trait]
impl Generator for FilteredGenerator {
    async fn generate(&self, cancel: &CancellationToken) -> Result<Vec<UrlRef>, SourceError> {
        let found = self.inner.generate(cancel).await?;
        Ok(self.filters.apply(cancel, found).await?)
    }
}
