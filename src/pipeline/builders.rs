//! Ready-made pipeline shapes for the supported source kinds.
//!
//! ```text
//! sitemap/rss/file:  base ─► [source] ─► sink
//! pagination:        [page range] ─► [html listing] ─► sink
//! ```

use std::{sync::Arc, time::Duration};

use crate::extractor::{ContentExtractor, ReadabilityExtractor, TranscriptExtractor};
use crate::fetcher::{DEFAULT_REQUEST_TIMEOUT, HttpClient, HttpProfile};
use crate::pipeline::{
    adapters::Fetcher,
    filtered::Filtered,
    pagination::PageRangeGenerator,
    processor::{HttpContentProcessor, StoreSaver},
    spec::{PipelineSpec, SinkSpec, StageSpec},
};
use crate::repositories::ArticleStore;
use crate::urls::{
    FeedSource, FileSource, FilterChain, HtmlPageSource, SitemapSource, SourceError, UrlExtractor,
    sites::extract_data_engineering_podcast,
};

pub const PODCAST_TIMEOUT: Duration = Duration::from_secs(30);

/// Worker counts for single-stage pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerCounts {
    pub url_fetchers: usize,
    pub content: usize,
}

impl Default for WorkerCounts {
    fn default() -> Self {
        Self {
            url_fetchers: 2,
            content: 3,
        }
    }
}

/// Worker counts for the two-stage pagination pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWorkers {
    pub page_generators: usize,
    pub html_fetchers: usize,
    pub content: usize,
}

impl Default for PaginationWorkers {
    fn default() -> Self {
        Self {
            page_generators: 1,
            html_fetchers: 3,
            content: 5,
        }
    }
}

/// What every pipeline shape needs besides its source.
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<dyn ArticleStore>,
    /// Applied to the URLs of the stage feeding the sink.
    pub filters: FilterChain,
    pub request_timeout: Duration,
}

impl PipelineDeps {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self {
            store,
            filters: FilterChain::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn client(&self, profile: HttpProfile) -> Result<HttpClient, SourceError> {
        Ok(HttpClient::with_timeout(profile, self.request_timeout)?)
    }

    fn sink(&self, workers: usize, extractor: impl ContentExtractor + 'static) -> Result<SinkSpec, SourceError> {
        let processor = HttpContentProcessor::new(self.client(HttpProfile::Browser)?, extractor);
        Ok(SinkSpec::new(
            workers,
            Arc::new(processor),
            Arc::new(StoreSaver::new(self.store.clone())),
        ))
    }

    fn single_stage(
        &self,
        name: &str,
        source: impl Fetcher + 'static,
        workers: WorkerCounts,
    ) -> Result<PipelineSpec, SourceError> {
        let stage = StageSpec::fetcher(name, workers.url_fetchers, Filtered::new(source, self.filters.clone()));
        Ok(PipelineSpec::new(vec![stage], self.sink(workers.content, ReadabilityExtractor)?))
    }
}

pub fn sitemap_pipeline(deps: &PipelineDeps, workers: WorkerCounts) -> Result<PipelineSpec, SourceError> {
    let source = SitemapSource::new(deps.client(HttpProfile::Browser)?);
    deps.single_stage("sitemap", source, workers)
}

pub fn rss_pipeline(deps: &PipelineDeps, workers: WorkerCounts) -> Result<PipelineSpec, SourceError> {
    let source = FeedSource::new(deps.client(HttpProfile::Browser)?);
    deps.single_stage("rss", source, workers)
}

/// The base URL handed to `Pipeline::run` is the path of the URL list.
pub fn file_pipeline(deps: &PipelineDeps, workers: WorkerCounts) -> Result<PipelineSpec, SourceError> {
    deps.single_stage("file", FileSource, workers)
}

pub fn pagination_pipeline(
    deps: &PipelineDeps,
    base_url: &str,
    pattern: &str,
    extractor: UrlExtractor,
    workers: PaginationWorkers,
) -> Result<PipelineSpec, SourceError> {
    paginated(deps, base_url, pattern, extractor, workers, ReadabilityExtractor)
}

/// Pagination over a podcast's episode listing; article bodies are the
/// episode transcripts.
pub fn podcast_transcript_pipeline(
    deps: &PipelineDeps,
    base_url: &str,
    pattern: &str,
    workers: PaginationWorkers,
) -> Result<PipelineSpec, SourceError> {
    let deps = deps.clone().with_timeout(PODCAST_TIMEOUT);
    paginated(
        &deps,
        base_url,
        pattern,
        extract_data_engineering_podcast,
        workers,
        TranscriptExtractor,
    )
}

fn paginated(
    deps: &PipelineDeps,
    base_url: &str,
    pattern: &str,
    extractor: UrlExtractor,
    workers: PaginationWorkers,
    content: impl ContentExtractor + 'static,
) -> Result<PipelineSpec, SourceError> {
    let pages = PageRangeGenerator::new(deps.client(HttpProfile::Minimal)?, base_url, pattern)?;
    let listing = HtmlPageSource::new(deps.client(HttpProfile::Browser)?, extractor);

    let stages = vec![
        StageSpec::generator("pages", workers.page_generators, pages),
        StageSpec::fetcher(
            "listing",
            workers.html_fetchers,
            Filtered::new(listing, deps.filters.clone()),
        ),
    ];
    Ok(PipelineSpec::new(stages, deps.sink(workers.content, content)?))
}
