use async_trait::async_trait;
use feed_rs::parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::entities::UrlRef;
use crate::fetcher::HttpClient;
use crate::pipeline::Fetcher;
use crate::urls::errors::SourceError;

/// RSS 0.9x/2.0, Atom and JSON Feed source. Yields each entry's first link
/// with the entry title.
#[derive(Debug, Clone)]
pub struct FeedSource {
    client: HttpClient,
}

impl FeedSource {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for FeedSource {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<UrlRef>, SourceError> {
        let page = self.client.get(cancel, url).await?;
        let urls = parse_feed(&page.body_raw)?;
        if urls.is_empty() {
            return Err(SourceError::EmptyFeed(url.to_string()));
        }

        info!(count = urls.len(), "feed parsed");
        Ok(urls)
    }
}

/// Entry links as published; relative links are passed through untouched.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<UrlRef>, SourceError> {
    let feed = parser::parse(bytes).map_err(|err| SourceError::Parse {
        format: "feed",
        reason: err.to_string(),
    })?;

    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first()?.href.trim().to_string();
            if link.is_empty() {
                return None;
            }
            let title = entry.title.map(|t| t.content).unwrap_or_default();
            Some(UrlRef::titled(link, title.trim()))
        })
        .collect())
}
