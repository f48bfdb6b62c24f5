#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use blogharvest::{
    entities::{Article, UrlRef},
    extractor::ExtractError,
    pipeline::{ContentProcessor, Fetcher, Generator, PipelineEvent, ProcessError},
    urls::SourceError,
};

pub fn article_html(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{title}</title></head><body><article><p>{body}</p></article></body></html>"
    )
}

pub async fn mount_html(server: &MockServer, at: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("Content-Type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

pub async fn mount_xml(server: &MockServer, at: &str, xml: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(xml)
                .insert_header("Content-Type", "application/xml"),
        )
        .mount(server)
        .await;
}

pub async fn mount_head(server: &MockServer, at: &str, status: u16) {
    Mock::given(method("HEAD"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub fn urlset(locs: &[String]) -> String {
    let entries: String = locs
        .iter()
        .map(|loc| format!("<url><loc>{loc}</loc><lastmod>2024-01-01</lastmod></url>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#
    )
}

pub fn sitemap_index(locs: &[String]) -> String {
    let entries: String = locs
        .iter()
        .map(|loc| format!("<sitemap><loc>{loc}</loc></sitemap>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</sitemapindex>"#
    )
}

pub fn rss(items: &[(String, &str)]) -> String {
    let entries: String = items
        .iter()
        .map(|(link, title)| format!("<item><title>{title}</title><link>{link}</link></item>"))
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Blog</title><link>https://ex.com</link><description>d</description>{entries}</channel></rss>"#
    )
}

/// Collects every pipeline event for later assertions.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<PipelineEvent>>>);

impl Recorder {
    pub fn observer(&self) -> impl Fn(&PipelineEvent) + Send + Sync + 'static {
        let events = self.0.clone();
        move |event: &PipelineEvent| events.lock().unwrap().push(event.clone())
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events().iter().filter(|event| matches(event)).count()
    }

    pub fn failures(&self) -> Vec<PipelineEvent> {
        self.events()
            .into_iter()
            .filter(|event| matches!(event, PipelineEvent::Failure { .. }))
            .collect()
    }

    pub fn closed_queues(&self) -> Vec<usize> {
        let mut queues: Vec<usize> = self
            .events()
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::QueueClosed { queue } => Some(*queue),
                _ => None,
            })
            .collect();
        queues.sort_unstable();
        queues
    }
}

/// Returns a fixed list, whatever it is asked.
pub struct ListSource(pub Vec<String>);

impl ListSource {
    pub fn numbered(prefix: &str, count: usize) -> Self {
        Self((0..count).map(|i| format!("{prefix}{i}")).collect())
    }

    fn urls(&self) -> Vec<UrlRef> {
        self.0.iter().map(UrlRef::new).collect()
    }
}

#[async_trait]
impl Fetcher for ListSource {
    async fn fetch(&self, _: &CancellationToken, _: &str) -> Result<Vec<UrlRef>, SourceError> {
        Ok(self.urls())
    }
}

#[async_trait]
impl Generator for ListSource {
    async fn generate(&self, _: &CancellationToken) -> Result<Vec<UrlRef>, SourceError> {
        Ok(self.urls())
    }
}

/// Expands `u` into `u/0 .. u/(children - 1)`; fails for the inputs in
/// `fail_on` and panics for those in `panic_on`.
pub struct FanOut {
    pub children: usize,
    pub fail_on: HashSet<String>,
    pub panic_on: HashSet<String>,
}

impl FanOut {
    pub fn new(children: usize) -> Self {
        Self {
            children,
            fail_on: HashSet::new(),
            panic_on: HashSet::new(),
        }
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.fail_on.insert(url.to_string());
        self
    }

    pub fn panicking_on(mut self, url: &str) -> Self {
        self.panic_on.insert(url.to_string());
        self
    }
}

#[async_trait]
impl Fetcher for FanOut {
    async fn fetch(&self, _: &CancellationToken, url: &str) -> Result<Vec<UrlRef>, SourceError> {
        if self.panic_on.contains(url) {
            panic!("cannot handle {url}");
        }
        if self.fail_on.contains(url) {
            return Err(SourceError::Parse {
                format: "listing",
                reason: format!("cannot expand {url}"),
            });
        }
        tokio::task::yield_now().await;
        Ok((0..self.children)
            .map(|i| UrlRef::new(format!("{url}/{i}")))
            .collect())
    }
}

/// Never returns unless cancelled.
pub struct Stalled;

#[async_trait]
impl Fetcher for Stalled {
    async fn fetch(&self, cancel: &CancellationToken, _: &str) -> Result<Vec<UrlRef>, SourceError> {
        cancel.cancelled().await;
        Err(SourceError::Cancelled { partial: Vec::new() })
    }
}

/// Builds articles without any I/O; fails extraction for `fail_on`.
#[derive(Default)]
pub struct FakeProcessor {
    pub fail_on: HashSet<String>,
    /// Panic on every URL.
    pub panics: bool,
}

impl FakeProcessor {
    pub fn failing_on(url: &str) -> Self {
        Self {
            fail_on: HashSet::from([url.to_string()]),
            panics: false,
        }
    }

    pub fn panicking() -> Self {
        Self {
            fail_on: HashSet::new(),
            panics: true,
        }
    }
}

#[async_trait]
impl ContentProcessor for FakeProcessor {
    async fn process(&self, _: &CancellationToken, url: &str) -> Result<Article, ProcessError> {
        if self.panics {
            panic!("cannot process {url}");
        }
        if self.fail_on.contains(url) {
            return Err(ExtractError::TitleNotFound.into());
        }
        tokio::task::yield_now().await;
        Ok(Article::new(url, format!("title of {url}"), "body"))
    }
}
