use async_trait::async_trait;
use std::{collections::HashSet, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entities::UrlRef;
use crate::urls::errors::FilterError;

/// Predicate deciding whether a discovered URL moves on downstream.
#[async_trait]
pub trait UrlFilter: Send + Sync {
    async fn should_keep(&self, cancel: &CancellationToken, url: &str) -> Result<bool, FilterError>;

    fn name(&self) -> &'static str;
}

/// Drops site roots: URLs whose path is empty or `/`. Unparseable URLs are
/// kept and left to fail later.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseUrlFilter;

#[async_trait]
impl UrlFilter for BaseUrlFilter {
    async fn should_keep(&self, _cancel: &CancellationToken, url: &str) -> Result<bool, FilterError> {
        match url::Url::parse(url) {
            Ok(parsed) => Ok(!parsed.path().trim_matches('/').is_empty()),
            Err(_) => Ok(true),
        }
    }

    fn name(&self) -> &'static str {
        "base_url"
    }
}

/// Drops URLs already present in the store when the run started.
#[derive(Debug, Clone)]
pub struct AlreadyPersistedFilter {
    known: Arc<HashSet<String>>,
}

impl AlreadyPersistedFilter {
    pub fn new(known: impl Into<Arc<HashSet<String>>>) -> Self {
        Self {
            known: known.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

#[async_trait]
impl UrlFilter for AlreadyPersistedFilter {
    async fn should_keep(&self, _cancel: &CancellationToken, url: &str) -> Result<bool, FilterError> {
        Ok(!self.known.contains(url))
    }

    fn name(&self) -> &'static str {
        "already_persisted"
    }
}

/// Keeps only URLs containing a path fragment, e.g. `/blog/`.
#[derive(Debug, Clone)]
pub struct ContainsPathFilter {
    segment: String,
}

impl ContainsPathFilter {
    pub fn new(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
        }
    }
}

#[async_trait]
impl UrlFilter for ContainsPathFilter {
    async fn should_keep(&self, _cancel: &CancellationToken, url: &str) -> Result<bool, FilterError> {
        Ok(url.contains(&self.segment))
    }

    fn name(&self) -> &'static str {
        "contains_path"
    }
}

/// Ordered conjunction of filters. The first `false` drops a URL; the first
/// error aborts the whole batch.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn UrlFilter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Arc<dyn UrlFilter>>) -> Self {
        Self { filters }
    }

    pub fn with(mut self, filter: impl UrlFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub async fn keeps(&self, cancel: &CancellationToken, url: &str) -> Result<bool, FilterError> {
        for filter in &self.filters {
            if cancel.is_cancelled() {
                return Err(FilterError::Cancelled);
            }
            if !filter.should_keep(cancel, url).await? {
                debug!(filter = filter.name(), url, "url dropped");
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub async fn apply(
        &self,
        cancel: &CancellationToken,
        urls: Vec<UrlRef>,
    ) -> Result<Vec<UrlRef>, FilterError> {
        if self.filters.is_empty() {
            return Ok(urls);
        }

        let mut kept = Vec::with_capacity(urls.len());
        for url in urls {
            if self.keeps(cancel, &url.location).await? {
                kept.push(url);
            }
        }
        Ok(kept)
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.name()))
            .finish()
    }
}
