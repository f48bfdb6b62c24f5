//! Podcast transcript harvesting.
//!
//! Episode URLs come from a sitemap. Each episode page is fetched, its show
//! notes extracted, and the transcript it links to (PDF or plain text)
//! downloaded and read. A page without a usable transcript is still stored
//! with an empty transcript; only pages without any readable content are
//! skipped.

mod document;
mod link;
mod page;

pub use document::{TranscriptFormat, transcript_text};
pub use link::find_transcript_url;
pub use page::{episode_page_text, episode_title};

use futures::{StreamExt, stream};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::entities::PodcastTranscript;
use crate::fetcher::{FetchError, HttpClient};
use crate::pipeline::Fetcher;
use crate::repositories::{StoreError, TranscriptStore};
use crate::urls::{SitemapSource, SourceError};

pub const DEFAULT_WORKERS: usize = 100;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("failed to list episodes: {0}")]
    Sitemap(#[source] SourceError),

    #[error(transparent)]
    Fetch(FetchError),

    #[error("no readable content on episode page {0}")]
    EmptyPage(String),

    #[error("unsupported transcript document {0}")]
    Unsupported(String),

    #[error("failed to read PDF transcript: {0}")]
    Pdf(String),

    #[error("transcript is empty")]
    EmptyTranscript,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("transcript harvest cancelled")]
    Cancelled,
}

impl From<FetchError> for TranscriptError {
    fn from(err: FetchError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Fetch(err)
        }
    }
}

/// Totals for one sitemap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscriptReport {
    /// Episodes taken from the sitemap, after the limit.
    pub listed: usize,
    /// Episodes already stored.
    pub skipped: usize,
    pub saved: usize,
    pub failed: usize,
}

pub struct TranscriptService {
    client: HttpClient,
    sitemap: SitemapSource,
    store: Arc<dyn TranscriptStore>,
    workers: usize,
}

impl TranscriptService {
    pub fn new(client: HttpClient, store: Arc<dyn TranscriptStore>) -> Self {
        Self {
            sitemap: SitemapSource::new(client.clone()),
            client,
            store,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Episodes processed concurrently; at least one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Harvest the first `max` episodes of `sitemap_url` (all when `None`)
    /// that are not stored yet. Per-episode failures are counted, not
    /// returned.
    #[instrument(skip_all, fields(sitemap = %sitemap_url))]
    pub async fn download_from_sitemap(
        &self,
        cancel: &CancellationToken,
        sitemap_url: &str,
        max: Option<usize>,
    ) -> Result<TranscriptReport, TranscriptError> {
        let mut episodes: Vec<String> = match self.sitemap.fetch(cancel, sitemap_url).await {
            Ok(urls) => urls.into_iter().map(|url| url.location).collect(),
            Err(SourceError::EmptyFeed(_)) => Vec::new(),
            Err(err) if err.is_cancelled() => return Err(TranscriptError::Cancelled),
            Err(err) => return Err(TranscriptError::Sitemap(err)),
        };
        if let Some(max) = max {
            episodes.truncate(max);
        }
        let listed = episodes.len();

        match self.store.existing_transcripts(&episodes).await {
            Ok(existing) => episodes.retain(|url| !existing.contains(url)),
            Err(err) => warn!(error = %err, "could not check stored transcripts, processing every episode"),
        }

        let mut report = TranscriptReport {
            listed,
            skipped: listed - episodes.len(),
            ..TranscriptReport::default()
        };
        info!(listed, skipped = report.skipped, workers = self.workers, "processing episodes");

        let mut outcomes = stream::iter(episodes)
            .map(|url| async move {
                let outcome = self.process_episode(cancel, &url).await;
                (url, outcome)
            })
            .buffer_unordered(self.workers);

        while let Some((url, outcome)) = outcomes.next().await {
            match outcome {
                Ok(()) => report.saved += 1,
                Err(TranscriptError::Cancelled) => {}
                Err(err) => {
                    warn!(url = %url, error = %err, "skipping episode");
                    report.failed += 1;
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(TranscriptError::Cancelled);
        }

        info!(saved = report.saved, failed = report.failed, "transcript harvest complete");
        Ok(report)
    }

    async fn process_episode(&self, cancel: &CancellationToken, url: &str) -> Result<(), TranscriptError> {
        let page = self.client.get(cancel, url).await?;
        let html = page.body_utf8.as_str();

        let page_content = episode_page_text(html);
        if page_content.is_empty() {
            return Err(TranscriptError::EmptyPage(url.to_string()));
        }
        let title = episode_title(html).unwrap_or_default();
        let (transcript_url, transcript) = self.transcript_for(cancel, url, html).await?;

        let record = PodcastTranscript {
            url: url.to_string(),
            title,
            page_content,
            transcript,
            transcript_url,
            crawled_at: chrono::Utc::now(),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TranscriptError::Cancelled),
            saved = self.store.save_transcript(&record) => saved?,
        }

        info!(
            url,
            title = %record.title,
            transcript_chars = record.transcript.len(),
            "episode saved"
        );
        Ok(())
    }

    /// The resolved transcript link and its text. Anything short of
    /// cancellation leaves the text empty.
    async fn transcript_for(
        &self,
        cancel: &CancellationToken,
        episode_url: &str,
        html: &str,
    ) -> Result<(Option<String>, String), TranscriptError> {
        let Some(href) = find_transcript_url(html) else {
            debug!(url = episode_url, "no transcript link");
            return Ok((None, String::new()));
        };
        let resolved = match Url::parse(episode_url).and_then(|base| base.join(&href)) {
            Ok(resolved) => resolved.to_string(),
            Err(err) => {
                debug!(url = episode_url, href = %href, error = %err, "unresolvable transcript link");
                return Ok((None, String::new()));
            }
        };

        let text = match self.client.download(cancel, &resolved).await {
            Ok(download) => transcript_text(&download).await,
            Err(err) => Err(err.into()),
        };
        match text {
            Ok(text) => Ok((Some(resolved), text)),
            Err(TranscriptError::Cancelled) => Err(TranscriptError::Cancelled),
            Err(err) => {
                warn!(url = episode_url, transcript_url = %resolved, error = %err, "transcript unavailable");
                Ok((Some(resolved), String::new()))
            }
        }
    }
}
