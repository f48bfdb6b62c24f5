use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::{collections::HashSet, sync::LazyLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::entities::UrlRef;
use crate::extractor::collapse_whitespace;
use crate::fetcher::HttpClient;
use crate::pipeline::Fetcher;
use crate::urls::errors::SourceError;

/// Pulls article links out of a listing page. The second argument is the
/// URL the page was served from.
pub type UrlExtractor = fn(&str, &Url) -> Vec<UrlRef>;

static BASE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("base[href]").unwrap());
static CANONICAL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel='canonical'][href]").unwrap());
static OG_URL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property='og:url'][content]").unwrap());

/// Fetches a listing page and runs an [`UrlExtractor`] over it.
#[derive(Debug, Clone)]
pub struct HtmlPageSource {
    client: HttpClient,
    extractor: UrlExtractor,
}

impl HtmlPageSource {
    pub fn new(client: HttpClient, extractor: UrlExtractor) -> Self {
        Self { client, extractor }
    }
}

#[async_trait]
impl Fetcher for HtmlPageSource {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<UrlRef>, SourceError> {
        let page = self.client.get(cancel, url).await?;
        let urls = (self.extractor)(&page.body_utf8, &page.url_final);
        if urls.is_empty() {
            return Err(SourceError::NoUrlsFound(url.to_string()));
        }

        debug!(count = urls.len(), "links extracted");
        Ok(urls)
    }
}

/// Base for relative hrefs: `<base href>`, then the origin of the canonical
/// link or `og:url`, then the page itself.
pub fn document_base(document: &Html, page_url: &Url) -> Url {
    if let Some(href) = document
        .select(&BASE_SELECTOR)
        .next()
        .and_then(|base| base.value().attr("href"))
        && let Ok(base) = page_url.join(href.trim())
    {
        return base;
    }

    for (selector, attr) in [(&*CANONICAL_SELECTOR, "href"), (&*OG_URL_SELECTOR, "content")] {
        if let Some(value) = document
            .select(selector)
            .next()
            .and_then(|element| element.value().attr(attr))
            && let Ok(mut origin) = Url::parse(value.trim())
            && origin.has_host()
        {
            origin.set_path("");
            origin.set_query(None);
            origin.set_fragment(None);
            return origin;
        }
    }

    page_url.clone()
}

/// Absolute, fragment-free form of `href`, or `None` for in-page anchors and
/// non-navigational schemes.
pub fn resolve_href(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Link text, then the `title` attribute, then the parent's text, then the URL.
pub fn link_title(link: &ElementRef<'_>, location: &str) -> String {
    let text = collapse_whitespace(&link.text().collect::<String>());
    if !text.is_empty() {
        return text;
    }

    if let Some(title) = link.value().attr("title").map(str::trim)
        && !title.is_empty()
    {
        return title.to_string();
    }

    if let Some(parent) = link.parent().and_then(ElementRef::wrap) {
        let text = collapse_whitespace(&parent.text().collect::<String>());
        if !text.is_empty() {
            return text;
        }
    }

    location.to_string()
}

/// Accumulates links in document order, dropping repeats.
#[derive(Debug, Default)]
pub struct LinkCollector {
    seen: HashSet<String>,
    urls: Vec<UrlRef>,
}

impl LinkCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `link` if its href resolves and has not been seen yet.
    pub fn push(&mut self, link: &ElementRef<'_>, base: &Url) -> bool {
        self.push_if(link, base, |_| true)
    }

    /// Like [`push`](Self::push), but only when `accept` approves the
    /// resolved location.
    pub fn push_if(
        &mut self,
        link: &ElementRef<'_>,
        base: &Url,
        accept: impl Fn(&str) -> bool,
    ) -> bool {
        let Some(location) = link
            .value()
            .attr("href")
            .and_then(|href| resolve_href(href, base))
        else {
            return false;
        };
        if !accept(&location) || !self.seen.insert(location.clone()) {
            return false;
        }

        let title = link_title(link, &location);
        self.urls.push(UrlRef::titled(location, title));
        true
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_urls(self) -> Vec<UrlRef> {
        self.urls
    }
}
