use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::entities::Article;
use crate::extractor::{ContentExtractor, ExtractError};
use crate::fetcher::{FetchError, HttpClient, SOFT_ERROR_MARKER};
use crate::pipeline::adapters::{ContentProcessor, ContentSaver};
use crate::pipeline::errors::ProcessError;
use crate::repositories::{ArticleStore, StoreError};

/// Fetches an article page over HTTP and runs a [`ContentExtractor`] on it.
#[derive(Clone)]
pub struct HttpContentProcessor {
    client: HttpClient,
    extractor: Arc<dyn ContentExtractor>,
    allow_empty_text: bool,
}

impl HttpContentProcessor {
    pub fn new(client: HttpClient, extractor: impl ContentExtractor + 'static) -> Self {
        Self {
            client,
            extractor: Arc::new(extractor),
            allow_empty_text: false,
        }
    }

    /// Save articles even when no body text could be extracted.
    pub fn allow_empty_text(mut self, allow: bool) -> Self {
        self.allow_empty_text = allow;
        self
    }
}

#[async_trait]
impl ContentProcessor for HttpContentProcessor {
    #[instrument(skip_all, fields(url = %url))]
    async fn process(&self, cancel: &CancellationToken, url: &str) -> Result<Article, ProcessError> {
        let page = self.client.get(cancel, url).await?;
        let html = page.body_utf8.as_str();

        if html.trim().is_empty() || html.contains(SOFT_ERROR_MARKER) {
            return Err(FetchError::SoftError(format!("{url} returned a soft-error page")).into());
        }

        let title = self.extractor.extract_title(html)?;
        let text = self.extractor.extract_text(html)?;
        if text.is_empty() && !self.allow_empty_text {
            return Err(ExtractError::EmptyText.into());
        }

        debug!(title = %title, chars = text.len(), "article extracted");
        Ok(Article::new(url, title, text))
    }
}

/// Persists articles through any [`ArticleStore`].
#[derive(Clone)]
pub struct StoreSaver {
    store: Arc<dyn ArticleStore>,
}

impl StoreSaver {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ContentSaver for StoreSaver {
    async fn save(&self, cancel: &CancellationToken, article: &Article) -> Result<(), StoreError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            saved = self.store.save(article) => saved,
        }
    }
}
