use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::entities::UrlRef;
use crate::urls::html::{LinkCollector, document_base};

static ARTICLE_LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("article a").unwrap());
static MAIN_LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("main a").unwrap());
static BODY_LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body a").unwrap());

/// Anchors that usually carry an article title, tried in this order.
static TITLE_LINKS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "a.entry-title",
        "a.post-title",
        "a.article-link",
        "a.article-title",
        "h2 a",
        "h3 a",
        ".entry-title a",
        ".post-title a",
        ".article-title a",
    ]
    .iter()
    .map(|selector| Selector::parse(selector).unwrap())
    .collect()
});

const CHROME_ELEMENTS: [&str; 3] = ["nav", "header", "footer"];
const CHROME_CLASSES: [&str; 5] = ["nav", "header", "footer", "menu", "sidebar"];

const NON_CONTENT_PATHS: [&str; 16] = [
    "/tag/",
    "/category/",
    "/author/",
    "/archive/",
    "/page/",
    "/search",
    "/feed",
    "/rss",
    "/atom",
    "/login",
    "/register",
    "/about",
    "/contact",
    "/privacy",
    "/terms",
    "/cookie",
];

/// Site-agnostic listing extractor.
///
/// 1. links inside `<article>`
/// 2. if none, links inside `<main>`
/// 3. links matching title-like selectors (always)
/// 4. if still none, every body link outside site chrome whose path does
///    not look like navigation
pub fn extract_generic(html: &str, page_url: &Url) -> Vec<UrlRef> {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);
    let mut links = LinkCollector::new();

    for link in document.select(&ARTICLE_LINKS) {
        links.push(&link, &base);
    }

    if links.is_empty() {
        for link in document.select(&MAIN_LINKS) {
            links.push(&link, &base);
        }
    }

    for selector in TITLE_LINKS.iter() {
        for link in document.select(selector) {
            links.push(&link, &base);
        }
    }

    if links.is_empty() {
        for link in document.select(&BODY_LINKS) {
            if inside_chrome(&link) {
                continue;
            }
            links.push_if(&link, &base, is_content_link);
        }
    }

    links.into_urls()
}

fn inside_chrome(link: &ElementRef<'_>) -> bool {
    link.ancestors().filter_map(ElementRef::wrap).any(|ancestor| {
        let element = ancestor.value();
        CHROME_ELEMENTS.contains(&element.name())
            || element
                .classes()
                .any(|class| CHROME_CLASSES.contains(&class))
    })
}

fn is_content_link(location: &str) -> bool {
    let lower = location.to_lowercase();
    !NON_CONTENT_PATHS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://ex.com/page/1").unwrap()
    }

    fn locations(urls: &[UrlRef]) -> Vec<&str> {
        urls.iter().map(|url| url.location.as_str()).collect()
    }

    #[test]
    fn article_links_come_first() {
        let html = r#"<html><body>
            <nav><a href="/about">About</a></nav>
            <article><a href="/posts/a">A</a></article>
            <article><a href="/posts/b">B</a></article>
            <main><a href="/posts/ignored">Ignored</a></main>
        </body></html>"#;

        let urls = extract_generic(html, &page());
        assert_eq!(
            locations(&urls),
            vec!["https://ex.com/posts/a", "https://ex.com/posts/b"]
        );
        assert_eq!(urls[0].title.as_deref(), Some("A"));
    }

    #[test]
    fn main_links_when_no_articles() {
        let html = r#"<html><body>
            <main><a href="/posts/a">A</a></main>
            <aside><a href="/posts/z">Z</a></aside>
        </body></html>"#;

        let urls = extract_generic(html, &page());
        assert_eq!(locations(&urls), vec!["https://ex.com/posts/a"]);
    }

    #[test]
    fn title_selectors_always_contribute() {
        let html = r#"<html><body>
            <article><a href="/posts/a">A</a></article>
            <div class="list"><h2><a href="/posts/b">B</a></h2><h3><a href="/posts/a">dup</a></h3></div>
        </body></html>"#;

        let urls = extract_generic(html, &page());
        assert_eq!(
            locations(&urls),
            vec!["https://ex.com/posts/a", "https://ex.com/posts/b"]
        );
    }

    #[test]
    fn body_fallback_skips_chrome_and_blocklist() {
        let html = r#"<html><body>
            <header><a href="/posts/header">H</a></header>
            <div class="sidebar"><a href="/posts/side">S</a></div>
            <div class="content">
              <a href="/posts/keep">Keep</a>
              <a href="/Tag/rust">Tag</a>
              <a href="/page/2">Next</a>
              <a href="mailto:x@ex.com">Mail</a>
              <a href="https://other.com/posts/ext#frag">External</a>
            </div>
            <footer><a href="/posts/footer">F</a></footer>
        </body></html>"#;

        let urls = extract_generic(html, &page());
        assert_eq!(
            locations(&urls),
            vec!["https://ex.com/posts/keep", "https://other.com/posts/ext"]
        );
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(extract_generic("<html><body><p>nothing</p></body></html>", &page()).is_empty());
    }
}
