use async_trait::async_trait;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::entities::UrlRef;
use crate::fetcher::HttpClient;
use crate::pipeline::adapters::Generator;
use crate::urls::SourceError;

const PLACEHOLDER: &str = "%d";

/// Every this many pages the page body is checked for an empty-content
/// marker.
pub const CONTENT_CHECK_INTERVAL: u32 = 10;

pub const DEFAULT_EMPTY_MARKERS: &[&str] = &["0 episodes found"];

/// Emits `base_url + pattern(k)` for k = 1, 2, ... while each page answers
/// `HEAD` with 200 and no periodic content check finds an empty-content
/// marker.
#[derive(Debug, Clone)]
pub struct PageRangeGenerator {
    client: HttpClient,
    base_url: String,
    pattern: String,
    empty_markers: Vec<String>,
}

impl PageRangeGenerator {
    pub fn new(
        client: HttpClient,
        base_url: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let pattern = pattern.into();
        if pattern.matches(PLACEHOLDER).count() != 1 {
            return Err(SourceError::InvalidPattern(pattern));
        }

        Ok(Self {
            client,
            base_url: base_url.into(),
            pattern,
            empty_markers: DEFAULT_EMPTY_MARKERS.iter().map(|m| m.to_lowercase()).collect(),
        })
    }

    /// Replace the markers; matching is case-insensitive.
    pub fn with_empty_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.empty_markers = markers
            .into_iter()
            .map(|m| m.as_ref().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        self
    }

    pub fn page_url(&self, page: u32) -> String {
        format!(
            "{}{}",
            self.base_url,
            self.pattern.replacen(PLACEHOLDER, &page.to_string(), 1)
        )
    }

    async fn is_live(&self, cancel: &CancellationToken, url: &str) -> Result<bool, SourceError> {
        match self.client.head(cancel, url).await {
            Ok(StatusCode::OK) => Ok(true),
            Ok(status) => {
                info!(url, %status, "pagination ended");
                Ok(false)
            }
            Err(err) if err.is_cancelled() => Err(err.into()),
            Err(err) => {
                warn!(url, error = %err, "page check failed, ending pagination");
                Ok(false)
            }
        }
    }

    /// Whether `url` carries one of the empty-content markers. A failed
    /// check counts as "has content".
    async fn is_empty_page(&self, cancel: &CancellationToken, url: &str) -> Result<bool, SourceError> {
        if self.empty_markers.is_empty() {
            return Ok(false);
        }

        match self.client.get(cancel, url).await {
            Ok(page) => {
                let body = page.body_utf8.to_lowercase();
                Ok(self.empty_markers.iter().any(|marker| body.contains(marker)))
            }
            Err(err) if err.is_cancelled() => Err(err.into()),
            Err(err) => {
                debug!(url, error = %err, "content check failed, continuing");
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl Generator for PageRangeGenerator {
    #[instrument(skip_all, fields(base_url = %self.base_url, pattern = %self.pattern))]
    async fn generate(&self, cancel: &CancellationToken) -> Result<Vec<UrlRef>, SourceError> {
        let mut pages = Vec::new();

        for page in 1u32.. {
            let url = self.page_url(page);

            let live = match self.is_live(cancel, &url).await {
                Ok(live) => live,
                Err(err) if err.is_cancelled() => return Err(SourceError::Cancelled { partial: pages }),
                Err(err) => return Err(err),
            };
            if !live {
                break;
            }

            if page % CONTENT_CHECK_INTERVAL == 0 {
                match self.is_empty_page(cancel, &url).await {
                    Ok(true) => {
                        info!(url, "empty-content marker found, pagination ended");
                        break;
                    }
                    Ok(false) => {}
                    Err(err) if err.is_cancelled() => return Err(SourceError::Cancelled { partial: pages }),
                    Err(err) => return Err(err),
                }
            }

            debug!(url, "page found");
            pages.push(UrlRef::new(url));
        }

        info!(pages = pages.len(), "pagination complete");
        Ok(pages)
    }
}
