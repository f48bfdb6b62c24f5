use async_trait::async_trait;
use quick_xml::{Reader, events::Event};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::entities::UrlRef;
use crate::fetcher::HttpClient;
use crate::pipeline::Fetcher;
use crate::urls::errors::SourceError;

/// Bytes inspected to tell a sitemap index from a url set.
const PEEK_WINDOW: usize = 512;

/// Nested indexes deeper than this are ignored.
const MAX_INDEX_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    Index(Vec<String>),
    UrlSet(Vec<String>),
}

/// W3C sitemap 0.9 source. Follows `<sitemapindex>` documents and yields the
/// `<loc>` of every `<url>` found in the tree.
#[derive(Debug, Clone)]
pub struct SitemapSource {
    client: HttpClient,
}

impl SitemapSource {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn collect<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        url: &'a str,
        depth: usize,
    ) -> futures::future::BoxFuture<'a, Result<Vec<UrlRef>, SourceError>> {
        Box::pin(async move {
            let page = self.client.get(cancel, url).await?;
            let document = parse_sitemap(&page.body_utf8)?;

            match document {
                SitemapDocument::UrlSet(locations) => Ok(locations
                    .iter()
                    .filter_map(|loc| resolve_loc(&page.url_final, loc))
                    .map(UrlRef::new)
                    .collect()),
                SitemapDocument::Index(children) => {
                    if depth >= MAX_INDEX_DEPTH {
                        warn!(url, depth, "sitemap index nested too deeply, skipping");
                        return Ok(Vec::new());
                    }

                    let mut urls = Vec::new();
                    for child in children
                        .iter()
                        .filter_map(|loc| resolve_loc(&page.url_final, loc))
                    {
                        match self.collect(cancel, &child, depth + 1).await {
                            Ok(found) => {
                                debug!(sitemap = %child, count = found.len(), "child sitemap parsed");
                                urls.extend(found);
                            }
                            Err(err) if err.is_cancelled() => return Err(err),
                            Err(err) => {
                                warn!(sitemap = %child, error = %err, "skipping child sitemap");
                            }
                        }
                    }
                    Ok(urls)
                }
            }
        })
    }
}

#[async_trait]
impl Fetcher for SitemapSource {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<UrlRef>, SourceError> {
        let urls = self.collect(cancel, url, 0).await?;
        if urls.is_empty() {
            return Err(SourceError::EmptyFeed(url.to_string()));
        }

        info!(count = urls.len(), "sitemap parsed");
        Ok(urls)
    }
}

/// Relative `<loc>` values are not standard but do show up; resolve them
/// against the sitemap's own URL.
fn resolve_loc(base: &Url, loc: &str) -> Option<String> {
    match Url::parse(loc) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(loc).ok().map(String::from),
        Err(err) => {
            debug!(loc, error = %err, "ignoring malformed sitemap loc");
            None
        }
    }
}

fn is_index(xml: &str) -> bool {
    let window = &xml.as_bytes()[..xml.len().min(PEEK_WINDOW)];
    String::from_utf8_lossy(window).contains("sitemapindex")
}

/// Parse a sitemap or sitemap index body into its `<loc>` values.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, SourceError> {
    let index = is_index(xml);
    let entry_tag: &[u8] = if index { b"sitemap" } else { b"url" };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locations = Vec::new();
    let mut in_entry = false;
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == entry_tag => in_entry = true,
            Ok(Event::End(e)) if e.name().as_ref() == entry_tag => in_entry = false,
            Ok(Event::Start(e)) if in_entry && e.name().as_ref() == b"loc" => {
                in_loc = true;
                current.clear();
            }
            Ok(Event::End(e)) if in_loc && e.name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = current.trim();
                if !loc.is_empty() {
                    locations.push(loc.to_string());
                }
            }
            Ok(Event::Text(e)) if in_loc => {
                let text = e.unescape().map_err(|err| SourceError::Parse {
                    format: "sitemap",
                    reason: err.to_string(),
                })?;
                current.push_str(&text);
            }
            Ok(Event::CData(e)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(SourceError::Parse {
                    format: "sitemap",
                    reason: err.to_string(),
                });
            }
            _ => {}
        }
    }

    Ok(if index {
        SitemapDocument::Index(locations)
    } else {
        SitemapDocument::UrlSet(locations)
    })
}
